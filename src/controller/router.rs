//! Regex route parser

use regex::Regex;

/// Tests request paths against registered patterns, first match wins
pub struct RouteParser<R> {
    routes: Vec<Box<Fn(&str) -> Option<R>>>,
}

impl<R> Default for RouteParser<R> {
    fn default() -> Self {
        RouteParser { routes: Vec::new() }
    }
}

impl<R> RouteParser<R> {
    /// Adds a fixed route
    pub fn add_route<F>(&mut self, pattern: &str, f: F)
    where
        F: Fn() -> R + 'static,
    {
        let regex = compile(pattern);
        self.routes.push(Box::new(move |path| if regex.is_match(path) { Some(f()) } else { None }));
    }

    /// Adds a route with captured params
    pub fn add_route_with_params<F>(&mut self, pattern: &str, f: F)
    where
        F: Fn(Vec<&str>) -> Option<R> + 'static,
    {
        let regex = compile(pattern);
        self.routes.push(Box::new(move |path| {
            regex.captures(path).and_then(|captures| {
                let params = captures.iter().skip(1).filter_map(|capture| capture).map(|capture| capture.as_str()).collect();
                f(params)
            })
        }));
    }

    /// Tests a path against registered routes
    pub fn test(&self, path: &str) -> Option<R> {
        self.routes.iter().filter_map(|route| route(path)).next()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Failed to compile route pattern")
}

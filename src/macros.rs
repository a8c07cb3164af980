//! Macroses for the app

/// Implements diesel `ToSql`/`FromSql` over `Integer` for an id newtype.
macro_rules! newtype_id {
    ($t:ident) => {
        impl ::diesel::serialize::ToSql<::diesel::sql_types::Integer, ::diesel::pg::Pg> for $t {
            fn to_sql<W: ::std::io::Write>(
                &self,
                out: &mut ::diesel::serialize::Output<W, ::diesel::pg::Pg>,
            ) -> ::diesel::serialize::Result {
                ::diesel::serialize::ToSql::<::diesel::sql_types::Integer, ::diesel::pg::Pg>::to_sql(&self.0, out)
            }
        }

        impl ::diesel::deserialize::FromSql<::diesel::sql_types::Integer, ::diesel::pg::Pg> for $t {
            fn from_sql(bytes: Option<&[u8]>) -> ::diesel::deserialize::Result<Self> {
                <i32 as ::diesel::deserialize::FromSql<::diesel::sql_types::Integer, ::diesel::pg::Pg>>::from_sql(bytes).map($t)
            }
        }
    };
}

/// Implements diesel `ToSql`/`FromSql` over `VarChar` for a `String` newtype.
macro_rules! newtype_code {
    ($t:ident) => {
        impl ::diesel::serialize::ToSql<::diesel::sql_types::VarChar, ::diesel::pg::Pg> for $t {
            fn to_sql<W: ::std::io::Write>(
                &self,
                out: &mut ::diesel::serialize::Output<W, ::diesel::pg::Pg>,
            ) -> ::diesel::serialize::Result {
                out.write_all(self.0.as_bytes())
                    .map(|_| ::diesel::serialize::IsNull::No)
                    .map_err(Into::into)
            }
        }

        impl ::diesel::deserialize::FromSql<::diesel::sql_types::VarChar, ::diesel::pg::Pg> for $t {
            fn from_sql(bytes: Option<&[u8]>) -> ::diesel::deserialize::Result<Self> {
                match bytes {
                    Some(bytes) => ::std::str::from_utf8(bytes)
                        .map(|s| $t(s.to_string()))
                        .map_err(|_| format!("Invalid utf8 for {}", stringify!($t)).into()),
                    None => Err(format!("Unexpected null for {}", stringify!($t)).into()),
                }
            }
        }
    };
}

/// Implements diesel `ToSql`/`FromSql` over `VarChar` for an enum with
/// `Display`/`FromStr` string forms.
macro_rules! diesel_text_enum {
    ($t:ident) => {
        impl ::diesel::serialize::ToSql<::diesel::sql_types::VarChar, ::diesel::pg::Pg> for $t {
            fn to_sql<W: ::std::io::Write>(
                &self,
                out: &mut ::diesel::serialize::Output<W, ::diesel::pg::Pg>,
            ) -> ::diesel::serialize::Result {
                out.write_all(self.to_string().as_bytes())
                    .map(|_| ::diesel::serialize::IsNull::No)
                    .map_err(Into::into)
            }
        }

        impl ::diesel::deserialize::FromSql<::diesel::sql_types::VarChar, ::diesel::pg::Pg> for $t {
            fn from_sql(bytes: Option<&[u8]>) -> ::diesel::deserialize::Result<Self> {
                match bytes {
                    Some(bytes) => ::std::str::from_utf8(bytes)
                        .map_err(|_| format!("Invalid utf8 for {}", stringify!($t)).into())
                        .and_then(|s| {
                            s.parse::<$t>()
                                .map_err(|_| format!("Unrecognized {} variant: {}", stringify!($t), s).into())
                        }),
                    None => Err(format!("Unexpected null for {}", stringify!($t)).into()),
                }
            }
        }
    };
}

/// Extracts typed values from a query string, e.g.
/// `parse_query!(query, "latitude" => f64, "longitude" => f64)`.
macro_rules! parse_query {
    ($query:expr, $($name:tt => $t:ty),+) => {{
        let mut params = ::std::collections::HashMap::new();
        for pair in $query.split('&') {
            let mut it = pair.splitn(2, '=');
            if let (Some(key), Some(value)) = (it.next(), it.next()) {
                params.insert(key, value);
            }
        }
        ($(params.get($name).and_then(|value| value.parse::<$t>().ok())),+)
    }};
}

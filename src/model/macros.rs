/// Declares a model: a struct over a [`Record`](crate::Record), its
/// [`Model`](crate::Model) impl and one accessor trio per field.
///
/// ```
/// use minorm::{Field, Model, model};
///
/// model! {
///     pub struct User table = "users" {
///         id: String = Field::string().primary_key().ddl("varchar(50)").default_with(minorm::next_id),
///         name: String = Field::string().ddl("varchar(50)"),
///         admin: bool = Field::boolean(),
///         created_at: f64 = Field::float().default_with(minorm::now),
///     }
/// }
///
/// let mut user = User::new().unwrap().with_name("alice");
/// assert_eq!(user.name().unwrap(), "alice");
/// assert!(!user.admin().unwrap());
/// assert_eq!(User::meta().unwrap().table_name(), "users");
/// ```
///
/// For every field `f` this generates `f(&mut self) -> Result<T>`, which
/// resolves and stores the default on first read, plus `set_f` and `with_f`.
#[macro_export]
macro_rules! model {
    (@impl [$(#[$meta:meta])*] $vis:vis $name:ident $table:expr; $($field:ident : $ty:ty = $decl:expr),+) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            record: $crate::Record,
        }

        impl $crate::Model for $name {
            fn declare() -> $crate::ModelDecl {
                $crate::ModelDecl::new(stringify!($name))
                    .table_override($table)
                    $(.field(stringify!($field), $decl))+
            }

            fn from_record(record: $crate::Record) -> Self {
                Self { record }
            }

            fn record(&self) -> &$crate::Record {
                &self.record
            }

            fn record_mut(&mut self) -> &mut $crate::Record {
                &mut self.record
            }
        }

        $crate::paste::paste! {
            #[allow(dead_code)]
            impl $name {
                /// Instance with no values set; reads fall back to field defaults.
                $vis fn new() -> $crate::Result<Self> {
                    <Self as $crate::Model>::create()
                }

                $(
                    $vis fn $field(&mut self) -> $crate::Result<$ty> {
                        self.record.resolve_as::<$ty>(stringify!($field))
                    }

                    $vis fn [<set_ $field>](&mut self, value: impl Into<$ty>) -> &mut Self {
                        let value: $ty = value.into();
                        self.record.put(stringify!($field), $crate::Value::from(value));
                        self
                    }

                    $vis fn [<with_ $field>](mut self, value: impl Into<$ty>) -> Self {
                        self.[<set_ $field>](value);
                        self
                    }
                )+
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident table = $table:literal {
            $($field:ident : $ty:ty = $decl:expr),+ $(,)?
        }
    ) => {
        $crate::model!(@impl [$(#[$meta])*] $vis $name ::core::option::Option::Some($table); $($field : $ty = $decl),+);
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field:ident : $ty:ty = $decl:expr),+ $(,)?
        }
    ) => {
        $crate::model!(@impl [$(#[$meta])*] $vis $name ::core::option::Option::None; $($field : $ty = $decl),+);
    };
}

use super::field::Field;
use crate::core::{OrmError, Result};
use crate::executor::placeholder::count_placeholders;
use indexmap::IndexMap;
use std::collections::HashSet;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use tracing::{debug, info};

/// What a model type declares: its name, an optional table override and its
/// fields in declaration order.
#[derive(Debug, Clone)]
pub struct ModelDecl {
    type_name: String,
    table: Option<String>,
    fields: Vec<(String, Field)>,
}

impl ModelDecl {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn table_override(mut self, table: Option<&str>) -> Self {
        self.table = table.map(str::to_string);
        self
    }

    pub fn field(mut self, attribute: impl Into<String>, field: Field) -> Self {
        self.fields.push((attribute.into(), field));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Table metadata derived once per model type.
#[derive(Debug, Clone)]
pub struct TableMeta {
    type_name: String,
    table_name: String,
    mappings: IndexMap<String, Field>,
    primary_key: String,
    fields: Vec<String>,
    select_sql: String,
    insert_sql: String,
    update_sql: Option<String>,
    delete_sql: String,
}

impl TableMeta {
    /// Validates a declaration and synthesizes its SQL templates.
    pub fn build(decl: ModelDecl) -> Result<Self> {
        let ModelDecl {
            type_name,
            table,
            fields: declared,
        } = decl;

        let table_name = table.unwrap_or_else(|| type_name.clone());
        check_identifier(&type_name, "table", &table_name)?;
        info!("found model: {} (table: {})", type_name, table_name);

        let mut mappings = IndexMap::with_capacity(declared.len());
        let mut primary_key: Option<String> = None;
        let mut fields = Vec::new();
        let mut columns = HashSet::with_capacity(declared.len());

        for (attribute, field) in declared {
            check_identifier(&type_name, "attribute", &attribute)?;
            let field = field.bind_name(&attribute);
            if let Some(column) = field.column_name() {
                check_identifier(&type_name, "column", column)?;
            }
            debug!(" found mapping: {} ==> {}", attribute, field);

            if mappings.contains_key(&attribute) {
                return Err(OrmError::Schema(format!(
                    "Duplicate field '{}' in model '{}'",
                    attribute, type_name
                )));
            }

            let column = field.column_name().unwrap_or(&attribute).to_string();
            if !columns.insert(column.clone()) {
                return Err(OrmError::Schema(format!(
                    "Duplicate column '{}' for field '{}' in model '{}'",
                    column, attribute, type_name
                )));
            }

            if field.is_primary_key() {
                if let Some(existing) = &primary_key {
                    return Err(OrmError::Schema(format!(
                        "Duplicate primary key for field '{}' in model '{}' (already '{}')",
                        attribute, type_name, existing
                    )));
                }
                primary_key = Some(attribute.clone());
            } else {
                fields.push(attribute.clone());
            }
            mappings.insert(attribute, field);
        }

        let primary_key = primary_key.ok_or_else(|| {
            OrmError::Schema(format!("Primary key not found in model '{}'", type_name))
        })?;

        let column = |attribute: &str| -> String {
            mappings
                .get(attribute)
                .and_then(Field::column_name)
                .unwrap_or(attribute)
                .to_string()
        };
        let pk_column = column(&primary_key);

        let selected: Vec<String> = std::iter::once(&primary_key)
            .chain(fields.iter())
            .map(|attribute| {
                let col = column(attribute);
                if col == *attribute {
                    quote(&col)
                } else {
                    format!("{} as {}", quote(&col), quote(attribute))
                }
            })
            .collect();
        let select_sql = format!("select {} from {}", selected.join(", "), quote(&table_name));

        let inserted: Vec<String> = fields
            .iter()
            .chain(std::iter::once(&primary_key))
            .map(|attribute| quote(&column(attribute)))
            .collect();
        let insert_sql = format!(
            "insert into {} ({}) values ({})",
            quote(&table_name),
            inserted.join(", "),
            placeholders(fields.len() + 1)
        );

        let update_sql = if fields.is_empty() {
            None
        } else {
            let assignments: Vec<String> = fields
                .iter()
                .map(|attribute| format!("{} = ?", quote(&column(attribute))))
                .collect();
            Some(format!(
                "update {} set {} where {} = ?",
                quote(&table_name),
                assignments.join(", "),
                quote(&pk_column)
            ))
        };

        let delete_sql = format!(
            "delete from {} where {} = ?",
            quote(&table_name),
            quote(&pk_column)
        );

        let meta = Self {
            type_name,
            table_name,
            mappings,
            primary_key,
            fields,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
        };
        meta.verify()?;
        Ok(meta)
    }

    /// Every template must parse and carry exactly as many placeholders as
    /// its caller binds.
    fn verify(&self) -> Result<()> {
        let n = self.fields.len();
        let mut templates = vec![
            (self.select_sql.as_str(), 0),
            (self.insert_sql.as_str(), n + 1),
            (self.delete_sql.as_str(), 1),
        ];
        if let Some(update) = &self.update_sql {
            templates.push((update.as_str(), n + 1));
        }

        let dialect = MySqlDialect {};
        for (sql, expected) in templates {
            Parser::parse_sql(&dialect, sql).map_err(|e| {
                OrmError::Schema(format!(
                    "Generated SQL for model '{}' does not parse: {} ({})",
                    self.type_name, sql, e
                ))
            })?;
            let found = count_placeholders(sql);
            if found != expected {
                return Err(OrmError::Schema(format!(
                    "Template for model '{}' has {} placeholders, expected {}: {}",
                    self.type_name, found, expected, sql
                )));
            }
        }
        Ok(())
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn mappings(&self) -> &IndexMap<String, Field> {
        &self.mappings
    }

    pub fn field(&self, attribute: &str) -> Option<&Field> {
        self.mappings.get(attribute)
    }

    /// Attribute name of the primary key.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn primary_key_column(&self) -> &str {
        self.mappings
            .get(&self.primary_key)
            .and_then(Field::column_name)
            .unwrap_or(&self.primary_key)
    }

    /// Non-key attribute names in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    /// `None` when the model has no non-key fields to set.
    pub fn update_sql(&self) -> Option<&str> {
        self.update_sql.as_deref()
    }

    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }
}

/// MySQL identifier quoting.
pub(crate) fn quote(identifier: &str) -> String {
    format!("`{}`", identifier)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn check_identifier(model: &str, what: &str, identifier: &str) -> Result<()> {
    if identifier.is_empty() || identifier.contains(['`', '\0']) {
        return Err(OrmError::Schema(format!(
            "Invalid {} name {:?} in model '{}'",
            what, identifier, model
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_decl() -> ModelDecl {
        ModelDecl::new("User")
            .table("users")
            .field("id", Field::string().primary_key().ddl("varchar(50)"))
            .field("name", Field::string().ddl("varchar(50)"))
            .field("admin", Field::boolean())
            .field("created_at", Field::float())
    }

    #[test]
    fn test_user_templates() {
        let meta = TableMeta::build(user_decl()).unwrap();

        assert_eq!(meta.table_name(), "users");
        assert_eq!(meta.primary_key(), "id");
        assert_eq!(meta.fields(), ["name", "admin", "created_at"]);
        assert_eq!(
            meta.select_sql(),
            "select `id`, `name`, `admin`, `created_at` from `users`"
        );
        assert_eq!(
            meta.insert_sql(),
            "insert into `users` (`name`, `admin`, `created_at`, `id`) values (?, ?, ?, ?)"
        );
        assert_eq!(
            meta.update_sql(),
            Some("update `users` set `name` = ?, `admin` = ?, `created_at` = ? where `id` = ?")
        );
        assert_eq!(meta.delete_sql(), "delete from `users` where `id` = ?");
    }

    #[test]
    fn test_placeholder_counts_scale_with_fields() {
        for n in 1..8 {
            let mut decl = ModelDecl::new("Wide").field("pk", Field::integer().primary_key());
            for i in 0..n {
                decl = decl.field(format!("f{}", i), Field::text());
            }
            let meta = TableMeta::build(decl).unwrap();

            assert_eq!(count_placeholders(meta.select_sql()), 0);
            assert_eq!(count_placeholders(meta.insert_sql()), n + 1);
            assert_eq!(count_placeholders(meta.update_sql().unwrap()), n + 1);
            assert_eq!(count_placeholders(meta.delete_sql()), 1);
        }
    }

    #[test]
    fn test_table_defaults_to_type_name() {
        let meta = TableMeta::build(
            ModelDecl::new("Blog").field("id", Field::string().primary_key()),
        )
        .unwrap();
        assert_eq!(meta.table_name(), "Blog");
        assert_eq!(meta.select_sql(), "select `id` from `Blog`");
        assert!(meta.update_sql().is_none());
    }

    #[test]
    fn test_missing_primary_key() {
        let err = TableMeta::build(ModelDecl::new("NoKey").field("name", Field::string()))
            .unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("Primary key not found"));
    }

    #[test]
    fn test_duplicate_primary_key() {
        let decl = ModelDecl::new("TwoKeys")
            .field("a", Field::string().primary_key())
            .field("b", Field::integer().primary_key());
        let err = TableMeta::build(decl).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("Duplicate primary key"));
    }

    #[test]
    fn test_duplicate_attribute() {
        let decl = ModelDecl::new("Twice")
            .field("id", Field::string().primary_key())
            .field("name", Field::string())
            .field("name", Field::text());
        assert!(TableMeta::build(decl).unwrap_err().is_schema());
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let decl = ModelDecl::new("Post")
            .field("id", Field::string().primary_key())
            .field("title", Field::string().name("body"))
            .field("body", Field::text());
        let err = TableMeta::build(decl).unwrap_err();
        assert!(matches!(err, OrmError::Schema(ref msg) if msg.contains("Duplicate column 'body'")));

        let decl = ModelDecl::new("Post")
            .field("id", Field::string().primary_key())
            .field("slug", Field::string().name("id"));
        assert!(TableMeta::build(decl).unwrap_err().is_schema());

        let decl = ModelDecl::new("Post")
            .field("id", Field::string().primary_key())
            .field("title", Field::string().name("headline"))
            .field("body", Field::text());
        assert!(TableMeta::build(decl).is_ok());
    }

    #[test]
    fn test_backtick_in_identifier_rejected() {
        let decl = ModelDecl::new("Evil")
            .table("users` where 1=1 --")
            .field("id", Field::string().primary_key());
        assert!(TableMeta::build(decl).unwrap_err().is_schema());
    }

    #[test]
    fn test_column_name_override() {
        let decl = ModelDecl::new("Post")
            .field("id", Field::string().primary_key().name("post_id"))
            .field("title", Field::string().name("headline"));
        let meta = TableMeta::build(decl).unwrap();

        assert_eq!(meta.primary_key_column(), "post_id");
        assert_eq!(
            meta.select_sql(),
            "select `post_id` as `id`, `headline` as `title` from `Post`"
        );
        assert_eq!(
            meta.update_sql(),
            Some("update `Post` set `headline` = ? where `post_id` = ?")
        );
        assert_eq!(
            meta.insert_sql(),
            "insert into `Post` (`headline`, `post_id`) values (?, ?)"
        );
    }
}

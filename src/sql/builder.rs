//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and link queries from resolved descriptors.
//! Identifiers come from validated config only; every id and value is a bound parameter.

use crate::config::{ColumnInfo, ResolvedEntity, ResolvedLink, ResolvedModel, ResolvedRelation};
use crate::sql::SqlParam;
use std::collections::BTreeMap;

/// Quote identifier for PostgreSQL (safe: only from config).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: impl Into<SqlParam>) -> usize {
        self.params.push(v.into());
        self.params.len()
    }
}

/// `"id", "name", ...` optionally prefixed with a table alias.
fn select_column_list(columns: &[ColumnInfo], alias: Option<&str>) -> String {
    let prefix = alias.map(|a| format!("{}.", a)).unwrap_or_default();
    std::iter::once(format!("{}{}", prefix, quoted("id")))
        .chain(columns.iter().map(|c| format!("{}{}", prefix, quoted(&c.name))))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by id. Binds the id as $1.
pub fn select_by_id(entity: &ResolvedEntity, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        select_column_list(&entity.columns, None),
        quoted(&entity.table_name),
        quoted("id"),
        n
    );
    q
}

/// SELECT all rows ORDER BY id.
pub fn select_list(entity: &ResolvedEntity) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(&entity.columns, None),
        quoted(&entity.table_name),
        quoted("id")
    );
    q
}

/// INSERT one row with the given data columns; the store assigns `id`.
/// Columns of the entity missing from `values` are bound as NULL.
pub fn insert(entity: &ResolvedEntity, values: &BTreeMap<String, Option<String>>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        let n = q.push_param(values.get(&c.name).cloned().flatten());
        cols.push(quoted(&c.name));
        placeholders.push(format!("${}", n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(&entity.table_name),
        cols.join(", "),
        placeholders.join(", "),
        quoted("id")
    );
    q
}

/// UPDATE by id: SET only the entity columns present in `values`. None when nothing to set.
pub fn update(entity: &ResolvedEntity, id: i64, values: &BTreeMap<String, Option<String>>) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &entity.columns {
        let Some(v) = values.get(&c.name) else { continue };
        let n = q.push_param(v.clone());
        sets.push(format!("{} = ${}", quoted(&c.name), n));
    }
    if sets.is_empty() {
        return None;
    }
    let n = q.push_param(id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        quoted(&entity.table_name),
        sets.join(", "),
        quoted("id"),
        n
    );
    Some(q)
}

/// DELETE by id.
pub fn delete(entity: &ResolvedEntity, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${}",
        quoted(&entity.table_name),
        quoted("id"),
        n
    );
    q
}

/// Conditional insert of one link row, evaluated by the store in one statement.
/// Affects one row when the pair was inserted, zero when it already existed.
pub fn link_upsert(relation: &ResolvedRelation, self_id: i64, other_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let a = q.push_param(self_id);
    let b = q.push_param(other_id);
    let link = quoted(&relation.link_table);
    let self_fk = quoted(&relation.self_fk);
    let other_fk = quoted(&relation.other_fk);
    q.sql = format!(
        "INSERT INTO {link} ({self_fk}, {other_fk}) \
         SELECT ${a}::BIGINT, ${b}::BIGINT \
         WHERE NOT EXISTS (SELECT 1 FROM {link} WHERE {self_fk} = ${a} AND {other_fk} = ${b}) \
         ON CONFLICT DO NOTHING"
    );
    q
}

/// Plain link insert in declaration order; used for seeding.
pub fn insert_link(link: &ResolvedLink, left_id: i64, right_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let a = q.push_param(left_id);
    let b = q.push_param(right_id);
    q.sql = format!(
        "INSERT INTO {} ({}, {}) VALUES (${}, ${})",
        quoted(&link.table),
        quoted(&link.left.1),
        quoted(&link.right.1),
        a,
        b
    );
    q
}

/// COUNT of link rows referencing `id` on this entity's side.
pub fn count_related(relation: &ResolvedRelation, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(id);
    q.sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ${}",
        quoted(&relation.link_table),
        quoted(&relation.self_fk),
        n
    );
    q
}

/// Rows of the other entity joined through the link table for `id`.
pub fn select_related(relation: &ResolvedRelation, id: i64) -> QueryBuf {
    const OTHER: &str = "o";
    const LINK: &str = "l";
    let mut q = QueryBuf::new();
    let n = q.push_param(id);
    q.sql = format!(
        "SELECT {} FROM {} {OTHER} JOIN {} {LINK} ON {LINK}.{} = {OTHER}.{} WHERE {LINK}.{} = ${} ORDER BY {OTHER}.{}",
        select_column_list(&relation.other_columns, Some(OTHER)),
        quoted(&relation.other_table),
        quoted(&relation.link_table),
        quoted(&relation.other_fk),
        quoted("id"),
        quoted(&relation.self_fk),
        n,
        quoted("id"),
    );
    q
}

/// DROP statements for every table of the model, link tables first.
pub fn drop_tables(model: &ResolvedModel) -> Vec<String> {
    model
        .links
        .iter()
        .map(|l| l.table.as_str())
        .chain(model.entities.iter().map(|e| e.table_name.as_str()))
        .map(|t| format!("DROP TABLE IF EXISTS {} CASCADE", quoted(t)))
        .collect()
}

pub fn create_entity_table(entity: &ResolvedEntity) -> String {
    let mut defs = vec![format!("{} BIGSERIAL PRIMARY KEY", quoted("id"))];
    for c in &entity.columns {
        let mut def = format!("{} {}", quoted(&c.name), c.pg_type());
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        defs.push(def);
    }
    format!(
        "CREATE TABLE {} (\n  {}\n)",
        quoted(&entity.table_name),
        defs.join(",\n  ")
    )
}

/// Link table: two FK columns with referential actions and a UNIQUE pair constraint.
pub fn create_link_table(link: &ResolvedLink) -> String {
    let mut defs = Vec::new();
    for (table, column) in [&link.left, &link.right] {
        defs.push(format!(
            "{} BIGINT NOT NULL REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            quoted(column),
            quoted(table),
            quoted("id"),
            link.on_delete,
            link.on_update
        ));
    }
    defs.push(format!("UNIQUE ({}, {})", quoted(&link.left.1), quoted(&link.right.1)));
    format!("CREATE TABLE {} (\n  {}\n)", quoted(&link.table), defs.join(",\n  "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, FullConfig};

    fn model() -> ResolvedModel {
        resolve(&FullConfig::bookstore().unwrap()).unwrap()
    }

    #[test]
    fn select_by_id_binds_id() {
        let m = model();
        let q = select_by_id(m.entity_by_path("authors").unwrap(), 7);
        assert_eq!(q.sql, r#"SELECT "id", "name" FROM "author" WHERE "id" = $1"#);
        assert_eq!(q.params, vec![SqlParam::Int(7)]);
    }

    #[test]
    fn update_skips_unknown_columns() {
        let m = model();
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), Some("X".to_string()));
        values.insert("bogus".to_string(), Some("Y".to_string()));
        let q = update(m.entity_by_path("books").unwrap(), 3, &values).unwrap();
        assert_eq!(q.sql, r#"UPDATE "book" SET "name" = $1 WHERE "id" = $2"#);
        assert_eq!(q.params, vec![SqlParam::Text(Some("X".into())), SqlParam::Int(3)]);

        assert!(update(m.entity_by_path("books").unwrap(), 3, &BTreeMap::new()).is_none());
    }

    #[test]
    fn link_upsert_is_one_conditional_statement() {
        let m = model();
        let rel = m.entity_by_path("authors").unwrap().relation.clone().unwrap();
        let q = link_upsert(&rel, 1, 4);
        assert!(q.sql.starts_with(r#"INSERT INTO "author_book_rel" ("author_id", "book_id") SELECT"#));
        assert!(q.sql.contains("WHERE NOT EXISTS"));
        assert!(q.sql.ends_with("ON CONFLICT DO NOTHING"));
        assert!(!q.sql.contains('4'));
        assert_eq!(q.params, vec![SqlParam::Int(1), SqlParam::Int(4)]);
    }

    #[test]
    fn link_upsert_orients_columns_from_books_side() {
        let m = model();
        let rel = m.entity_by_path("books").unwrap().relation.clone().unwrap();
        let q = link_upsert(&rel, 4, 1);
        assert!(q.sql.starts_with(r#"INSERT INTO "author_book_rel" ("book_id", "author_id")"#));
    }

    #[test]
    fn related_list_joins_other_table_with_bound_id() {
        let m = model();
        let rel = m.entity_by_path("books").unwrap().relation.clone().unwrap();
        let q = select_related(&rel, 4);
        assert_eq!(
            q.sql,
            r#"SELECT o."id", o."name" FROM "author" o JOIN "author_book_rel" l ON l."author_id" = o."id" WHERE l."book_id" = $1 ORDER BY o."id""#
        );
        assert_eq!(q.params, vec![SqlParam::Int(4)]);
    }

    #[test]
    fn link_ddl_cascades_and_is_unique() {
        let m = model();
        let ddl = create_link_table(&m.links[0]);
        assert!(ddl.contains(r#""author_id" BIGINT NOT NULL REFERENCES "author" ("id") ON DELETE CASCADE ON UPDATE CASCADE"#));
        assert!(ddl.contains(r#"UNIQUE ("author_id", "book_id")"#));
        let drops = drop_tables(&m);
        assert_eq!(drops[0], r#"DROP TABLE IF EXISTS "author_book_rel" CASCADE"#);
    }

    #[test]
    fn entity_ddl_uses_varchar_bound() {
        let m = model();
        let ddl = create_entity_table(m.entity_by_path("authors").unwrap());
        assert!(ddl.contains(r#""id" BIGSERIAL PRIMARY KEY"#));
        assert!(ddl.contains(r#""name" VARCHAR(32)"#));
    }
}

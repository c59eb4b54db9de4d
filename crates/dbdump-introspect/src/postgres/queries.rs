use sqlx::PgPool;

use dbdump_core::{Error, Result};

fn db_error(err: sqlx::Error) -> Error {
    Error::Db(err.to_string())
}

pub async fn fetch_database_name(pool: &PgPool) -> Result<String> {
    sqlx::query_scalar::<_, String>("select current_database()::text")
        .fetch_one(pool)
        .await
        .map_err(db_error)
}

pub async fn list_tables(pool: &PgPool, schema: &str) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select c.relname::text
        from pg_class c
        join pg_namespace n on n.oid = c.relnamespace
        where n.nspname = $1
          and c.relkind in ('r', 'p')
          and not c.relispartition
        order by c.relname
        "#,
    )
    .bind(schema)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawColumn {
    pub ordinal_position: i16,
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default_expr: Option<String>,
    pub is_generated: bool,
    pub sequence: Option<String>,
}

pub async fn list_columns(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawColumn>> {
    sqlx::query_as::<_, RawColumn>(
        r#"
        select
          a.attnum as ordinal_position,
          a.attname::text as name,
          pg_catalog.format_type(a.atttypid, a.atttypmod) as data_type,
          (not a.attnotnull) as is_nullable,
          case
            when a.attgenerated = '' then pg_get_expr(ad.adbin, ad.adrelid)
            else null
          end as default_expr,
          (a.attgenerated <> '') as is_generated,
          pg_get_serial_sequence(format('%I.%I', n.nspname, c.relname), a.attname::text)
            as sequence
        from pg_attribute a
        join pg_class c on c.oid = a.attrelid
        join pg_namespace n on n.oid = c.relnamespace
        left join pg_attrdef ad on ad.adrelid = a.attrelid and ad.adnum = a.attnum
        where n.nspname = $1
          and c.relname = $2
          and a.attnum > 0
          and not a.attisdropped
        order by a.attnum
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

pub async fn get_primary_key(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<String>> {
    sqlx::query_scalar::<_, String>(
        r#"
        select a.attname::text
        from pg_index i
        join pg_attribute a on a.attrelid = i.indrelid and a.attnum = any(i.indkey)
        where i.indrelid = format('%I.%I', $1::text, $2::text)::regclass
          and i.indisprimary
        order by array_position(i.indkey::int2[], a.attnum)
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

#[derive(Debug, sqlx::FromRow)]
pub struct RawTrigger {
    pub name: String,
    /// `pg_trigger.tgenabled`: one of `O`, `D`, `R` or `A`.
    pub state: String,
}

pub async fn list_triggers(pool: &PgPool, schema: &str, table: &str) -> Result<Vec<RawTrigger>> {
    sqlx::query_as::<_, RawTrigger>(
        r#"
        select
          t.tgname::text as name,
          t.tgenabled::text as state
        from pg_trigger t
        where t.tgrelid = format('%I.%I', $1::text, $2::text)::regclass
          and not t.tgisinternal
        order by t.tgname
        "#,
    )
    .bind(schema)
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(db_error)
}

use dbdump_core::ident::column_list;
use dbdump_core::{QualifiedName, TableDescriptor, quote_literal};

/// `SELECT` producing the rows of a table's flat file.
///
/// Only included columns are selected, the configured filter is applied and
/// rows are ordered by primary key so successive dumps diff cleanly. The
/// result is a single line so it can be embedded in a psql `\copy`.
pub fn export_query(schema: &str, descriptor: &TableDescriptor) -> String {
    let mut query = format!(
        "SELECT {} FROM {}",
        column_list(descriptor.columns.iter().map(String::as_str)),
        QualifiedName::new(schema, &descriptor.name)
    );
    let filter = descriptor
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|filter| !filter.is_empty());
    if let Some(filter) = filter {
        query.push_str(&format!(" WHERE ({})", filter.replace(['\r', '\n'], " ")));
    }
    if !descriptor.primary_key.is_empty() {
        query.push_str(&format!(
            " ORDER BY {}",
            column_list(descriptor.primary_key.iter().map(String::as_str))
        ));
    }
    query
}

/// Server-side statement streaming a table's flat file to the client.
pub fn copy_out_statement(schema: &str, descriptor: &TableDescriptor) -> String {
    format!(
        "COPY ({}) TO STDOUT WITH (FORMAT csv, HEADER true)",
        export_query(schema, descriptor)
    )
}

/// Number of rows the export query returns, evaluated in the export snapshot.
pub fn count_statement(schema: &str, descriptor: &TableDescriptor) -> String {
    format!(
        "SELECT count(*) FROM ({}) AS exported",
        export_query(schema, descriptor)
    )
}

/// psql script reproducing an export from the artifact root.
pub fn render_export_script(schema: &str, descriptors: &[TableDescriptor]) -> String {
    let mut script = String::new();
    script.push_str("-- Exports every table in one read-only snapshot.\n");
    script.push_str("\\set ON_ERROR_STOP on\n\n");
    script.push_str("BEGIN ISOLATION LEVEL REPEATABLE READ, READ ONLY;\n\n");
    for descriptor in descriptors {
        script.push_str(&format!(
            "\\copy ({}) TO {} WITH CSV HEADER\n",
            export_query(schema, descriptor),
            quote_literal(&descriptor.data_file())
        ));
    }
    script.push_str("\nCOMMIT;\n");
    script
}

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use dbdump_core::{
    ColumnDefaultOverride, Error, Identifier, QualifiedName, Result, TableDescriptor,
    TriggerSuspension,
};

use crate::phase::Phase;
use crate::statement::{LoadStatement, Statement};

/// Statements of one phase, covering every table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSteps {
    pub phase: Phase,
    pub statements: Vec<Statement>,
}

/// Validated, ordered restore operations for a set of tables.
///
/// Built by [`plan_restore`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePlan {
    schema: String,
    tables: Vec<String>,
    overrides: Vec<ColumnDefaultOverride>,
    suspensions: Vec<TriggerSuspension>,
    steps: Vec<PhaseSteps>,
}

impl RestorePlan {
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Table names in restore order.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn overrides(&self) -> &[ColumnDefaultOverride] {
        &self.overrides
    }

    pub fn suspensions(&self) -> &[TriggerSuspension] {
        &self.suspensions
    }

    /// Every statement phase, in execution order. Empty phases are included.
    pub fn phases(&self) -> &[PhaseSteps] {
        &self.steps
    }

    pub fn statements(&self) -> impl Iterator<Item = (Phase, &Statement)> {
        self.steps
            .iter()
            .flat_map(|step| step.statements.iter().map(move |s| (step.phase, s)))
    }

    pub fn loads(&self) -> impl Iterator<Item = &LoadStatement> {
        self.statements().filter_map(|(_, statement)| statement.as_load())
    }

    pub fn statement_count(&self) -> usize {
        self.steps.iter().map(|step| step.statements.len()).sum()
    }
}

/// Plan the restore of `descriptors` (already in restore order) into `schema`.
///
/// Fails before anything touches a database when an excluded `NOT NULL`
/// column has no default to load with, when a default expression is not a
/// standalone literal expression, or when the descriptors contradict each
/// other.
pub fn plan_restore(schema: &str, descriptors: &[TableDescriptor]) -> Result<RestorePlan> {
    if descriptors.is_empty() {
        return Err(Error::Configuration("no tables to restore".to_string()));
    }

    let mut seen = BTreeSet::new();
    for descriptor in descriptors {
        if !seen.insert(descriptor.name.as_str()) {
            return Err(Error::Configuration(format!(
                "table `{}` is listed more than once",
                descriptor.name
            )));
        }
        if descriptor.columns.is_empty() {
            return Err(Error::Configuration(format!(
                "table `{}` has no columns to load",
                descriptor.name
            )));
        }
    }

    let mut overrides = Vec::new();
    let mut suspensions = Vec::new();
    for descriptor in descriptors {
        overrides.extend(plan_overrides(descriptor)?);
        suspensions.push(plan_suspension(descriptor)?);
        check_sequences(descriptor)?;
    }

    let qualified = |name: &str| QualifiedName::new(schema, name);
    let mut steps: Vec<PhaseSteps> = Phase::STATEMENT_PHASES
        .iter()
        .map(|phase| PhaseSteps {
            phase: *phase,
            statements: Vec::new(),
        })
        .collect();
    let mut push = |phase: Phase, statement: Statement| {
        if let Some(step) = steps.iter_mut().find(|step| step.phase == phase) {
            step.statements.push(statement);
        }
    };

    for descriptor in descriptors {
        push(
            Phase::DisableTriggers,
            Statement::DisableAllTriggers {
                table: qualified(&descriptor.name),
            },
        );
    }

    for default in &overrides {
        push(
            Phase::InstallDefaults,
            Statement::SetDefault {
                table: qualified(&default.table),
                column: Identifier::new(&default.column),
                expression: default.expression.clone(),
            },
        );
    }

    push(
        Phase::Truncate,
        Statement::Truncate {
            tables: descriptors.iter().map(|d| qualified(&d.name)).collect(),
        },
    );

    for suspension in &suspensions {
        for trigger in &suspension.keep_enabled {
            push(
                Phase::EnableLoadTriggers,
                Statement::EnableTrigger {
                    table: qualified(&suspension.table),
                    trigger: Identifier::new(trigger),
                },
            );
        }
    }

    for descriptor in descriptors {
        push(
            Phase::Load,
            Statement::Load(LoadStatement {
                table: qualified(&descriptor.name),
                table_name: descriptor.name.clone(),
                columns: descriptor.columns.clone(),
                file: descriptor.data_file(),
            }),
        );
    }

    for descriptor in descriptors {
        for binding in &descriptor.sequences {
            push(
                Phase::ResetSequences,
                Statement::ResetSequence {
                    table: qualified(&descriptor.name),
                    column: Identifier::new(&binding.column),
                    sequence: binding.sequence.clone(),
                },
            );
        }
    }

    for default in &overrides {
        let table = qualified(&default.table);
        let column = Identifier::new(&default.column);
        let statement = match &default.previous {
            Some(previous) => Statement::SetDefault {
                table,
                column,
                expression: previous.clone(),
            },
            None => Statement::DropDefault { table, column },
        };
        push(Phase::RestoreDefaults, statement);
    }

    for suspension in &suspensions {
        push(
            Phase::EnableTriggers,
            Statement::EnableAllTriggers {
                table: qualified(&suspension.table),
            },
        );
        for (trigger, mode) in &suspension.restore_modes {
            push(
                Phase::EnableTriggers,
                Statement::SetTriggerMode {
                    table: qualified(&suspension.table),
                    trigger: Identifier::new(trigger),
                    mode: *mode,
                },
            );
        }
        for trigger in &suspension.restore_disabled {
            push(
                Phase::EnableTriggers,
                Statement::DisableTrigger {
                    table: qualified(&suspension.table),
                    trigger: Identifier::new(trigger),
                },
            );
        }
    }

    let plan = RestorePlan {
        schema: schema.to_string(),
        tables: descriptors.iter().map(|d| d.name.clone()).collect(),
        overrides,
        suspensions,
        steps,
    };

    debug!(
        event = "plan_built",
        tables = plan.tables.len(),
        statements = plan.statement_count(),
        overrides = plan.overrides.len()
    );

    Ok(plan)
}

fn plan_overrides(descriptor: &TableDescriptor) -> Result<Vec<ColumnDefaultOverride>> {
    for column in descriptor.column_defaults.keys() {
        if descriptor.excluded(column).is_none() {
            return Err(Error::Configuration(format!(
                "default registered for {}.{column}, which is not an excluded column",
                descriptor.name
            )));
        }
    }

    let excluded: BTreeSet<&str> = descriptor
        .excluded_columns
        .iter()
        .map(|column| column.name.as_str())
        .collect();

    let mut overrides = Vec::new();
    for column in &descriptor.excluded_columns {
        if column.generated {
            continue;
        }

        match descriptor.column_defaults.get(&column.name) {
            Some(expression) => {
                check_default_expression(&descriptor.name, &column.name, expression, &excluded)?;
                overrides.push(ColumnDefaultOverride {
                    table: descriptor.name.clone(),
                    column: column.name.clone(),
                    expression: expression.clone(),
                    previous: column.schema_default.clone(),
                });
            }
            None if !column.nullable && column.schema_default.is_none() => {
                return Err(Error::MissingDefault {
                    table: descriptor.name.clone(),
                    column: column.name.clone(),
                });
            }
            None => {}
        }
    }
    Ok(overrides)
}

fn plan_suspension(descriptor: &TableDescriptor) -> Result<TriggerSuspension> {
    let disabled: BTreeSet<&str> = descriptor
        .disabled_triggers
        .iter()
        .map(String::as_str)
        .collect();
    for trigger in &descriptor.load_triggers {
        if disabled.contains(trigger.as_str()) {
            return Err(Error::Configuration(format!(
                "load trigger `{trigger}` on `{}` was disabled in the source database",
                descriptor.name
            )));
        }
    }

    Ok(TriggerSuspension {
        table: descriptor.name.clone(),
        keep_enabled: descriptor.load_triggers.clone(),
        restore_disabled: descriptor.disabled_triggers.clone(),
        restore_modes: descriptor
            .trigger_modes
            .iter()
            .filter(|(trigger, _)| !disabled.contains(trigger.as_str()))
            .map(|(trigger, mode)| (trigger.clone(), *mode))
            .collect(),
    })
}

fn check_sequences(descriptor: &TableDescriptor) -> Result<()> {
    for binding in &descriptor.sequences {
        if !descriptor.columns.contains(&binding.column) {
            return Err(Error::Configuration(format!(
                "sequence `{}` is bound to {}.{}, which is not loaded",
                binding.sequence, descriptor.name, binding.column
            )));
        }
    }
    Ok(())
}

static TOKEN: LazyLock<std::result::Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r#"'(?:[^']|'')*'|"(?:[^"]|"")*"|::\s*[A-Za-z_][A-Za-z0-9_$]*|[A-Za-z_][A-Za-z0-9_$]*\s*\(?|;"#,
    )
});

/// A default must be a single expression that does not read other excluded
/// columns, since those hold no data during the load.
fn check_default_expression(
    table: &str,
    column: &str,
    expression: &str,
    excluded: &BTreeSet<&str>,
) -> Result<()> {
    if expression.trim().is_empty() {
        return Err(Error::Configuration(format!(
            "default for {table}.{column} is empty"
        )));
    }

    let pattern = TOKEN
        .as_ref()
        .map_err(|err| Error::Configuration(format!("invalid token pattern: {err}")))?;
    for token in pattern.find_iter(expression) {
        let text = token.as_str();
        let referenced = if text == ";" {
            return Err(Error::Configuration(format!(
                "default for {table}.{column} contains a statement separator"
            )));
        } else if text.starts_with('\'') || text.starts_with("::") || text.ends_with('(') {
            continue;
        } else if let Some(quoted) = text.strip_prefix('"') {
            quoted
                .strip_suffix('"')
                .unwrap_or(quoted)
                .replace("\"\"", "\"")
        } else {
            text.trim().to_lowercase()
        };

        if excluded.contains(referenced.as_str()) {
            return Err(Error::Configuration(format!(
                "default for {table}.{column} references excluded column `{referenced}`"
            )));
        }
    }
    Ok(())
}

use anyhow::{Context, Result};
use comfy_table::Table;
use polars::prelude::DataFrame;
use rusqlite::Connection;
use tracing::{info, info_span};

use mhnav_cli::deline::{DelineColumns, deline_file};
use mhnav_clean::{CleaningRules, CompiledRules};
use mhnav_core::{BuildInput, BuiltTables, build_datasets};
use mhnav_ingest::DatasetSource;
use mhnav_match::{ConceptRuleset, vocabulary};
use mhnav_model::OutputTable;
use mhnav_output::{
    run_output_dir, write_csv_outputs, write_replacement_audit, write_sqlite_outputs,
};

use crate::cli::{BuildArgs, ConceptsArgs, DelineArgs};
use crate::summary::apply_table_style;
use crate::types::{BuildRunResult, TableSummary};

pub fn run_build(args: &BuildArgs) -> Result<BuildRunResult> {
    // One timestamp names the run directory, every file, and every default
    // table name, so a run's outputs stay recognizable as a set.
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let run_span = info_span!("build", run = %timestamp);
    let _run_guard = run_span.enter();

    let from_database = args.in_db.is_some();
    let index = DatasetSource::resolve(&args.index_dataset, from_database)?;
    let historical = DatasetSource::resolve(&args.historical_dataset, from_database)?;

    let ruleset = ConceptRuleset::from_path(&args.regex_file)?;
    let cleaning = match &args.cleaning_rules {
        Some(path) => CleaningRules::from_path(path)?.compile()?,
        None => CompiledRules::default(),
    };

    let input_db = match &args.in_db {
        Some(path) => Some(
            Connection::open(path)
                .with_context(|| format!("open input database {}", path.display()))?,
        ),
        None => None,
    };

    let built = build_datasets(BuildInput {
        index: &index,
        historical: &historical,
        ruleset: &ruleset,
        cleaning: &cleaning,
        include_context: args.include_context,
        input_db: input_db.as_ref(),
    })?;

    write_outputs(args, &timestamp, &built)
}

fn write_outputs(args: &BuildArgs, timestamp: &str, built: &BuiltTables) -> Result<BuildRunResult> {
    let mut tables: Vec<(OutputTable, &DataFrame)> = vec![
        (OutputTable::Positive, &built.positive),
        (OutputTable::Model, &built.model),
        (OutputTable::Index, &built.index),
    ];
    if let Some(regex) = &built.regex {
        tables.push((OutputTable::Regex, regex));
    }

    let mut summaries: Vec<TableSummary> = tables
        .iter()
        .map(|(table, df)| TableSummary {
            name: table.base_name().to_string(),
            rows: df.height(),
            csv: None,
            db_table: None,
        })
        .collect();

    let want_csv = !args.no_csv;
    let run_dir = if want_csv || args.audit_replacements {
        Some(run_output_dir(&args.outpath, timestamp)?)
    } else {
        None
    };

    if let Some(dir) = &run_dir {
        if want_csv {
            let named: Vec<(String, &DataFrame)> = tables
                .iter()
                .map(|(table, df)| (table.run_name(timestamp), *df))
                .collect();
            let paths = write_csv_outputs(dir, &named)?;
            for (summary, path) in summaries.iter_mut().zip(paths) {
                summary.csv = Some(path);
            }
        }
        if args.audit_replacements {
            write_replacement_audit(
                &dir.join(format!("replacements_index_{timestamp}.tsv")),
                &built.stats.index_replacements,
            )?;
            write_replacement_audit(
                &dir.join(format!("replacements_historical_{timestamp}.tsv")),
                &built.stats.historical_replacements,
            )?;
        }
    }

    if let Some(path) = &args.out_db {
        let conn = Connection::open(path)
            .with_context(|| format!("open output database {}", path.display()))?;
        let named: Vec<(String, &DataFrame)> = tables
            .iter()
            .map(|(table, df)| {
                let name =
                    override_name(args, *table).unwrap_or_else(|| table.run_name(timestamp));
                (name, *df)
            })
            .collect();
        write_sqlite_outputs(&conn, &named, args.overwrite_existing)?;
        for (summary, (name, _)) in summaries.iter_mut().zip(&named) {
            summary.db_table = Some(name.clone());
        }
        info!(database = %path.display(), tables = named.len(), "database output complete");
    }

    Ok(BuildRunResult {
        timestamp: timestamp.to_string(),
        run_dir,
        database: args.out_db.clone(),
        tables: summaries,
        stats: built.stats.clone(),
    })
}

fn override_name(args: &BuildArgs, table: OutputTable) -> Option<String> {
    match table {
        OutputTable::Positive => args.positive_table.clone(),
        OutputTable::Model => args.model_table.clone(),
        OutputTable::Index => args.index_table.clone(),
        OutputTable::Regex => args.regex_table.clone(),
    }
}

pub fn run_concepts(args: &ConceptsArgs) -> Result<()> {
    let mut table = Table::new();
    match &args.regex_file {
        Some(path) => {
            let ruleset = ConceptRuleset::from_path(path)?;
            table.set_header(vec!["Concept", "Rules"]);
            apply_table_style(&mut table);
            for (concept, count) in ruleset.concepts() {
                table.add_row(vec![concept, count.to_string()]);
            }
        }
        None => {
            table.set_header(vec!["Label"]);
            apply_table_style(&mut table);
            for label in vocabulary() {
                table.add_row(vec![label]);
            }
        }
    }
    println!("{table}");
    Ok(())
}

pub fn run_deline(args: &DelineArgs) -> Result<()> {
    let columns = DelineColumns {
        group_by: &args.groupby,
        line_column: &args.aggnotecount,
        text_column: &args.aggtext,
    };
    let outcome = deline_file(&args.input, &args.outfile, &columns)?;
    println!(
        "Delined {} rows into {} notes ({} output rows)",
        outcome.input_rows, outcome.notes, outcome.output_rows
    );
    println!("Output: {}", args.outfile.display());
    Ok(())
}

use clap::{Parser, Subcommand};
use iching_core::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "iching")]
#[command(about = "Consult the I Ching and keep a journal of readings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Cast a reading for a question
    Cast {
        /// The question to ask; prompted for when omitted
        question: Option<String>,

        /// Seed the coin tosses for a repeatable reading
        #[arg(long)]
        seed: Option<u64>,

        /// Request an interpretation without asking
        #[arg(long)]
        interpret: bool,

        /// Save to the journal without asking
        #[arg(long, conflicts_with = "dry_run")]
        save: bool,

        /// Show the reading only; never save or interpret
        #[arg(long, conflicts_with = "interpret")]
        dry_run: bool,
    },

    /// List past readings, oldest first
    Journal {
        /// Only show the most recent N entries
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one journal entry in full
    Show {
        /// Entry number as listed by `journal`
        entry: usize,
    },

    /// Export the journal as Markdown
    Export {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

struct CastOptions {
    question: Option<String>,
    seed: Option<u64>,
    interpret: bool,
    save: bool,
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    iching_core::logging::init_with_level(match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Exiting with error: {:?}", e);
            if e.is_fatal() {
                eprintln!("Error: {}", e);
            } else {
                eprintln!("Error: {}", e.user_message());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }

    // The table must be usable before anything else happens
    let loaded;
    let table: &ReferenceTable = match &config.data.table_path {
        Some(path) => {
            loaded = ReferenceTable::load(path)?;
            &loaded
        }
        None => ReferenceTable::bundled()?,
    };
    let problems = table.validate();
    if !problems.is_empty() {
        return Err(TableError::Invalid(problems).into());
    }

    match cli.command {
        Commands::Cast {
            question,
            seed,
            interpret,
            save,
            dry_run,
        } => cmd_cast(
            &config,
            table,
            CastOptions {
                question,
                seed,
                interpret,
                save,
                dry_run,
            },
        ),
        Commands::Journal { limit } => cmd_journal(&config, table, limit),
        Commands::Show { entry } => cmd_show(&config, table, entry),
        Commands::Export { output } => cmd_export(&config, table, output.as_deref()),
    }
}

fn cmd_cast(config: &Config, table: &ReferenceTable, options: CastOptions) -> Result<()> {
    let interactive = io::stdin().is_terminal();
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut consultation = Consultation::new(table);
    match options.question {
        Some(question) => {
            consultation.cast(&question, &mut rng)?;
        }
        None => loop {
            let Some(question) = prompt_line("What is your question? ")? else {
                return Err(Error::InvalidInput("no question given".into()));
            };
            match consultation.cast(&question, &mut rng) {
                Ok(_) => break,
                Err(e @ Error::InvalidInput(_)) if interactive => {
                    println!("{}", e.user_message());
                }
                Err(e) => return Err(e),
            }
        },
    }

    if let Some(reading) = consultation.reading() {
        display_reading(reading);
    }

    if options.dry_run {
        println!("\n[Dry run - not saving reading]");
        return Ok(());
    }

    let wants_interpretation =
        options.interpret || (interactive && confirm("Request an interpretation?", false)?);
    if wants_interpretation {
        match OpenAiInterpreter::from_config(&config.interpretation)? {
            Some(interpreter) => {
                println!("\nConsulting the interpreter...");
                let status = consultation.interpret(&interpreter)?.clone();
                match status {
                    InterpretationStatus::Failed(message) => println!("\n{}", message),
                    _ => {
                        if let Some(text) = consultation
                            .reading()
                            .and_then(|r| r.interpretation.as_deref())
                        {
                            display_interpretation(text);
                        }
                    }
                }
            }
            None => eprintln!(
                "Interpretation is unavailable: enable it in the config and set ${}.",
                config.interpretation.api_key_env
            ),
        }
    }

    let wants_save = options.save || (interactive && confirm("Save to journal?", true)?);
    if wants_save {
        let mut store = open_journal(config.data.journal_format, config.journal_path());
        match consultation.save(store.as_mut()) {
            Ok(true) => println!("\n✓ Reading saved to {}", store.path().display()),
            Ok(false) => {}
            Err(e) => {
                eprintln!("The reading above was not saved.");
                return Err(e);
            }
        }
    } else if !interactive {
        println!("\n[Not saved - pass --save to record this reading]");
    }

    Ok(())
}

fn cmd_journal(config: &Config, table: &ReferenceTable, limit: Option<usize>) -> Result<()> {
    let store = open_journal(config.data.journal_format, config.journal_path());
    let view = load_readings(store.as_ref(), table)?;

    if view.readings.is_empty() && view.skipped.is_empty() {
        println!("Your journal is empty.");
        return Ok(());
    }

    let mut rows: Vec<(usize, String)> = view
        .readings
        .iter()
        .map(|(position, reading)| {
            let mut line = format!(
                "{:>3}. {}  {}  → {}",
                position,
                reading.cast_at.format("%Y-%m-%d %H:%M"),
                reading.question,
                reading.primary.title()
            );
            if let Some(secondary) = &reading.secondary {
                line.push_str(&format!(" → {}", secondary.title()));
            }
            (*position, line)
        })
        .chain(view.skipped.iter().map(|skipped| {
            (
                skipped.position,
                format!(
                    "{:>3}. [unreadable entry: {}]",
                    skipped.position,
                    skipped.error.user_message()
                ),
            )
        }))
        .collect();
    rows.sort_by_key(|(position, _)| *position);

    let start = limit.map_or(0, |n| rows.len().saturating_sub(n));
    for (_, line) in &rows[start..] {
        println!("{}", line);
    }

    if !view.skipped.is_empty() {
        eprintln!("\n{} journal entries could not be shown.", view.skipped.len());
    }
    Ok(())
}

fn cmd_show(config: &Config, table: &ReferenceTable, entry: usize) -> Result<()> {
    let store = open_journal(config.data.journal_format, config.journal_path());
    let mut view = load_readings(store.as_ref(), table)?;

    if let Some(index) = view.readings.iter().position(|(p, _)| *p == entry) {
        let (_, reading) = view.readings.swap_remove(index);
        display_reading(&reading);
        if let Some(text) = &reading.interpretation {
            display_interpretation(text);
        }
        return Ok(());
    }

    match view.skipped.into_iter().find(|s| s.position == entry) {
        Some(skipped) => Err(skipped.error),
        None => Err(Error::InvalidInput(format!("no journal entry {}", entry))),
    }
}

fn cmd_export(config: &Config, table: &ReferenceTable, output: Option<&Path>) -> Result<()> {
    let store = open_journal(config.data.journal_format, config.journal_path());
    let view = load_readings(store.as_ref(), table)?;
    let readings: Vec<Reading> = view.readings.into_iter().map(|(_, r)| r).collect();
    let markdown = export_markdown(&readings);

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, markdown)?;
            println!("✓ Exported {} readings to {}", readings.len(), path.display());
        }
        None => print!("{}", markdown),
    }

    if !view.skipped.is_empty() {
        eprintln!("{} journal entries could not be exported.", view.skipped.len());
    }
    Ok(())
}

fn display_reading(reading: &Reading) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", reading.question);
    println!("╰─────────────────────────────────────────╯");
    println!(
        "  Cast {} at {}",
        reading.cast,
        reading.cast_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!();

    display_diagram(&reading.cast, true);
    println!();
    display_hexagram(&reading.primary);

    let changing = reading.changing_line_texts();
    if !changing.is_empty() {
        println!("\n  Changing lines:");
        for (position, text) in changing {
            println!("  → Line {}: {}", position + 1, text.line_zh);
            println!("            {}", text.line_en);
        }
    }

    if let (Some(secondary), Some(cast)) = (&reading.secondary, reading.secondary_cast()) {
        println!("\n  Evolving into:\n");
        display_diagram(&cast, false);
        println!();
        display_hexagram(secondary);
    }
    println!();
}

/// Draw the hexagram top line first, marking changing lines o (yang) and x (yin)
fn display_diagram(cast: &Cast, mark_changing: bool) {
    for line in cast.lines().iter().rev() {
        let bar = if line.is_yang() {
            "━━━━━━━━━"
        } else {
            "━━━━   ━━━━"
        };
        let mark = match line {
            LineValue::OldYang if mark_changing => "o",
            LineValue::OldYin if mark_changing => "x",
            _ => "",
        };
        println!("    {:<11}  {}", bar, mark);
    }
}

fn display_hexagram(hexagram: &HexagramRecord) {
    println!("  {}", hexagram.title());
    println!("  Judgment: {}", hexagram.judgment_zh);
    println!("            {}", hexagram.judgment_en);
    println!("  Image:    {}", hexagram.image_zh);
    println!("            {}", hexagram.image_en);
}

fn display_interpretation(text: &str) {
    println!("\n─────────────────────────────────────────");
    println!("{}", text.trim());
    println!("─────────────────────────────────────────");
}

/// Read one line from stdin; `None` at end of input
fn prompt_line(message: &str) -> Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn confirm(question: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let answer = prompt_line(&format!("{} {} ", question, hint))?;

    Ok(match answer.as_deref().map(str::to_lowercase).as_deref() {
        Some("y") | Some("yes") => true,
        Some("n") | Some("no") => false,
        _ => default,
    })
}

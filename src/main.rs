use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ontie::pipeline::generate_external;
use ontie::{taxdump, Config, DumpSource, Pipeline, RecordKind, EXTERNAL_NAMESPACE_THRESHOLD};

#[derive(Parser, Debug)]
#[command(author, version, about = "Curate ONTIE classes for IEDB taxa and source proteins")]
struct Cli {
    /// Root of the ONTIE workspace
    #[arg(long, env = "ONTIE_ROOT", default_value = ".", global = true)]
    root: PathBuf,

    /// Directory with the IEDB table exports
    #[arg(long, env = "ONTIE_DUMP", default_value = "dump", global = true)]
    dump: PathBuf,

    /// First organism id that belongs to IEDB instead of NCBI Taxonomy
    #[arg(long, env = "ONTIE_THRESHOLD", default_value_t = EXTERNAL_NAMESPACE_THRESHOLD, global = true)]
    threshold: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assign CURIEs to new IEDB records and write their stanzas
    AddNew {
        /// Which records to process
        #[arg(long, value_enum, default_value_t = Kinds::All)]
        kind: Kinds,
    },
    /// Rebuild the external table from the IEDB tables
    GenerateExternal {
        /// Manually curated rows, written before all generated rows
        #[arg(long)]
        manual: Option<PathBuf>,
    },
    /// Convert NCBI Taxonomy merged.dmp to Turtle
    Merged {
        merged_dmp: PathBuf,
        merged_ttl: PathBuf,
    },
    /// Convert NCBI Taxonomy delnodes.dmp to Turtle
    Obsolete {
        delnodes_dmp: PathBuf,
        obsolete_ttl: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kinds {
    Organisms,
    Proteins,
    All,
}

impl Kinds {
    fn kinds(&self) -> &'static [RecordKind] {
        match self {
            Kinds::Organisms => &[RecordKind::Organism],
            Kinds::Proteins => &[RecordKind::Protein],
            Kinds::All => RecordKind::all(),
        }
    }
}

fn add_new(config: &Config, kinds: Kinds) -> Result<()> {
    // everything that can fail on configuration happens before the first write
    let mut source = DumpSource::open(config)
        .with_context(|| format!("reading IEDB tables from {}", config.dump_dir().display()))?;
    let mut pipeline = Pipeline::load(config).context("loading ONTIE tables")?;
    info!("Processing {:?}", kinds);

    let summary = pipeline
        .run(&mut source, kinds.kinds())
        .context("adding new classes")?;

    if summary.added() == 0 {
        println!("No new organisms or proteins to add");
    } else {
        for kind in kinds.kinds() {
            println!("{} new {}s added", summary.added_of(*kind), kind);
        }
    }
    if summary.external() > 0 {
        println!("{} new external classes added", summary.external());
    }
    Ok(())
}

fn convert<F>(input: &Path, output: &Path, f: F) -> Result<usize>
where
    F: FnOnce(BufReader<File>, BufWriter<File>) -> ontie::OntieResult<usize>,
{
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("opening {}", input.display()))?,
    );
    let writer = BufWriter::new(
        File::create(output).with_context(|| format!("creating {}", output.display()))?,
    );
    f(reader, writer).with_context(|| format!("converting {}", input.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::new(&cli.root, &cli.dump).with_threshold(cli.threshold);

    match cli.command {
        Command::AddNew { kind } => add_new(&config, kind)?,
        Command::GenerateExternal { manual } => {
            let config = match manual {
                Some(manual) => config.with_manual_external(manual),
                None => config,
            };
            config.validate()?;
            let mut source = DumpSource::open(&config)?;
            let count = generate_external(&config, &mut source)?;
            println!("{} external classes written", count);
        }
        Command::Merged {
            merged_dmp,
            merged_ttl,
        } => {
            let count = convert(&merged_dmp, &merged_ttl, taxdump::merged_to_turtle)?;
            println!("{} merged taxa written to {}", count, merged_ttl.display());
        }
        Command::Obsolete {
            delnodes_dmp,
            obsolete_ttl,
        } => {
            let count = convert(&delnodes_dmp, &obsolete_ttl, taxdump::obsolete_to_turtle)?;
            println!("{} obsolete taxa written to {}", count, obsolete_ttl.display());
        }
    }
    Ok(())
}

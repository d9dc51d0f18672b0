use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rtopic::{
    read_document_subset, Corpus, InitialState, RecursiveConfig, RecursiveLda, Vocabulary,
};

const CONFIG_FILE: &str = "config.json";
const REPORT_FILE: &str = "topwords.txt";

#[derive(Parser, Debug)]
#[command(name = "rtopic", about = "Recursive LDA topic hierarchies")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Inputs {
    /// Vocabulary file, one word per line
    #[arg(long)]
    word_voc_file: PathBuf,
    /// Corpus file, one document of word ids per line
    #[arg(long)]
    word_file: PathBuf,
    /// Document indices to train on, one per line
    #[arg(long)]
    selected_docs_file: Option<PathBuf>,
    /// Number of top words per topic in the report
    #[arg(long, default_value_t = 20)]
    num_top_words: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a hierarchy and write its state and report.
    Train {
        #[command(flatten)]
        inputs: Inputs,
        /// Output directory; the model goes into a subfolder named after it
        #[arg(long)]
        output_folder: PathBuf,
        /// Topics per level, e.g. 10,5
        #[arg(long, value_delimiter = ',', default_values_t = [10, 5])]
        ks: Vec<usize>,
        /// Topic-choice concentration per level (default 0.1 each)
        #[arg(long, value_delimiter = ',')]
        alphas: Vec<f64>,
        /// Word-emission concentration per level (default 0.1 each)
        #[arg(long, value_delimiter = ',')]
        betas: Vec<f64>,
        /// Initialization: random or preset
        #[arg(long, default_value = "random")]
        init: InitialState,
        /// Request hyperparameter optimization
        #[arg(long)]
        param_opt: bool,
        #[arg(long, default_value_t = 500)]
        burn_in: usize,
        #[arg(long, default_value_t = 1000)]
        max_iter: usize,
        #[arg(long, default_value_t = 50)]
        sample_lag: usize,
        /// Sweeps between progress reports
        #[arg(long, default_value_t = 25)]
        report: usize,
        /// Base random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Reload a saved model and rewrite its report.
    Report {
        #[command(flatten)]
        inputs: Inputs,
        /// Folder written by `train`
        #[arg(long)]
        model_folder: PathBuf,
    },

    /// Rebuild a model from its saved assignments and rewrite its report.
    Rebuild {
        #[command(flatten)]
        inputs: Inputs,
        /// Folder written by `train`
        #[arg(long)]
        model_folder: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Train {
            inputs,
            output_folder,
            ks,
            alphas,
            betas,
            init,
            param_opt,
            burn_in,
            max_iter,
            sample_lag,
            report,
            seed,
        } => {
            let per_level = |values: Vec<f64>| {
                if values.is_empty() {
                    vec![0.1; ks.len()]
                } else {
                    values
                }
            };
            let mut config = RecursiveConfig::new(ks.clone())
                .with_alphas(per_level(alphas))
                .with_betas(per_level(betas))
                .with_init(init)
                .with_optimize(param_opt)
                .with_schedule(burn_in, max_iter, sample_lag)
                .with_report_interval(report);
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            cmd_train(&inputs, &output_folder, config)?;
        }
        Commands::Report {
            inputs,
            model_folder,
        } => cmd_restore(&inputs, &model_folder, false)?,
        Commands::Rebuild {
            inputs,
            model_folder,
        } => cmd_restore(&inputs, &model_folder, true)?,
    }

    Ok(())
}

/// Model with vocabulary and training documents set, ready to initialize or load.
fn prepare(inputs: &Inputs, config: RecursiveConfig) -> anyhow::Result<RecursiveLda> {
    let vocabulary = Vocabulary::from_reader(BufReader::new(
        File::open(&inputs.word_voc_file)
            .with_context(|| format!("opening {}", inputs.word_voc_file.display()))?,
    ))?;
    let corpus = Corpus::from_reader(BufReader::new(
        File::open(&inputs.word_file)
            .with_context(|| format!("opening {}", inputs.word_file.display()))?,
    ))?;
    let subset = match &inputs.selected_docs_file {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            Some(read_document_subset(BufReader::new(file), corpus.len())?)
        }
        None => None,
    };

    let mut model = RecursiveLda::new();
    model.configure(vocabulary.len(), config)?;
    model.train(&corpus, subset.as_deref())?;
    model.set_vocabulary(vocabulary);
    Ok(model)
}

fn cmd_train(inputs: &Inputs, output_folder: &Path, config: RecursiveConfig) -> anyhow::Result<()> {
    let name = config.name();
    let folder = output_folder.join(&name);

    let mut model = prepare(inputs, config.clone())?;
    fs::create_dir_all(&folder).with_context(|| format!("creating {}", folder.display()))?;
    model.initialize()?;
    model.iterate()?;

    let health = model.health_check()?;
    if !health.is_healthy() {
        anyhow::bail!("trained tree failed validation:\n{}", health.validation);
    }

    fs::write(folder.join(CONFIG_FILE), serde_json::to_string_pretty(&config)?)?;
    model.save_state(folder.join(format!("{name}.state")))?;
    model.write_top_words_report(folder.join(REPORT_FILE), inputs.num_top_words)?;
    info!(folder = %folder.display(), "training finished");
    Ok(())
}

fn cmd_restore(inputs: &Inputs, model_folder: &Path, rebuild: bool) -> anyhow::Result<()> {
    let config_path = model_folder.join(CONFIG_FILE);
    let config: RecursiveConfig = serde_json::from_str(
        &fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?,
    )?;
    let state = model_folder.join(format!("{}.state", config.name()));

    let mut model = prepare(inputs, config)?;
    if rebuild {
        model.rebuild_from_assignments(&state)?;
    } else {
        model.load_state(&state)?;
    }
    model.write_top_words_report(model_folder.join(REPORT_FILE), inputs.num_top_words)?;
    Ok(())
}

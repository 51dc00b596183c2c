use clap::Parser;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tag_finder_lib::{
    extractor::TagExtractor,
    model::{ExtractionResult, ExtractorConfig},
    report::{self, ReportFormat},
    Diagnostics, Message,
};

/// How many skipped files the summary lists before eliding the rest.
const SKIPPED_SHOWN: usize = 10;

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum Format {
    #[default]
    Markdown,
    Plain,
    Json,
}

impl From<Format> for ReportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Markdown => ReportFormat::Markdown,
            Format::Plain => ReportFormat::Plain,
            Format::Json => ReportFormat::Json,
        }
    }
}

#[derive(clap::Parser, Debug)]
#[command(
    version,
    about,
    author,
    help_template(
        "\
{before-help}{name} {version} by {author-with-newline}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
    )
)]
struct Cli {
    /// A Python file, or a directory to search recursively.
    path: PathBuf,

    #[clap(short, long, default_value = "TODO:")]
    /// The tag to search for. Matching is exact and case sensitive.
    tag: String,

    #[clap(short, long, default_value = ExtractorConfig::DEFAULT_FILE_PATTERN)]
    /// Glob of the files to search in a directory. Patterns containing a '/'
    /// match paths relative to the directory, others match file names.
    pattern: String,

    #[clap(long)]
    /// Don't report functions.
    no_functions: bool,

    #[clap(long)]
    /// Don't report classes.
    no_classes: bool,

    #[clap(short, long)]
    /// Also save the report to this file.
    output: Option<PathBuf>,

    #[clap(short, long, value_enum, default_value_t)]
    /// Format of the saved report.
    format: Format,

    #[clap(long)]
    /// Only list matches, without their code.
    no_code: bool,

    #[clap(short, long)]
    /// Don't print the configuration, progress or summary.
    quiet: bool,
}

impl Cli {
    fn config(&self) -> Result<ExtractorConfig, tag_finder_lib::Error> {
        ExtractorConfig::new(self.tag.as_str(), &self.path)?
            .with_functions(!self.no_functions)
            .with_types(!self.no_classes)
            .with_file_pattern(self.pattern.as_str())
    }
}

struct Printer {
    red: Style,
    yellow: Style,
    green: Style,
    cyan: Style,
    bold: Style,
    dim: Style,
    quiet: bool,
    progress: ProgressBar,
}

impl Printer {
    fn new(quiet: bool) -> Self {
        let progress = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        let spinner_style = ProgressStyle::with_template("{spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");
        progress.set_style(spinner_style);

        Self {
            red: Style::new().red(),
            yellow: Style::new().yellow(),
            green: Style::new().green(),
            cyan: Style::new().cyan(),
            bold: Style::new().bold(),
            dim: Style::new().dim(),
            quiet,
            progress,
        }
    }

    fn error(&self, err: &tag_finder_lib::Error) {
        self.progress.finish_and_clear();
        eprintln!("{}", self.red.apply_to(err.to_string()));
    }

    fn banner(&self, config: &ExtractorConfig) {
        if self.quiet {
            return;
        }
        let mut kinds = vec![];
        if config.include_functions() {
            kinds.push("functions");
        }
        if config.include_types() {
            kinds.push("classes");
        }
        eprintln!("🔎 Searching for '{}'", self.bold.apply_to(config.tag()));
        eprintln!("  path     {}", config.root().display());
        if !config.is_single_file() {
            eprintln!("  pattern  {}", config.file_pattern());
        }
        eprintln!(
            "  in       {}",
            if kinds.is_empty() {
                "nothing".to_string()
            } else {
                kinds.join(" and ")
            }
        );
        eprintln!();
    }

    fn summary(&self, result: &ExtractionResult) {
        if self.quiet {
            return;
        }
        let config = &result.config;
        eprintln!("{}", self.bold.apply_to("Summary"));
        eprintln!("  tag        {}", self.bold.apply_to(config.tag()));
        if config.is_single_file() {
            eprintln!("  mode       single file");
            eprintln!("  file       {}", config.root().display());
        } else {
            eprintln!("  mode       recursive directory");
            eprintln!("  directory  {}", config.root().display());
            eprintln!("  processed  {}", result.processed_files);
        }
        eprintln!(
            "  matches    {}",
            self.green.apply_to(result.total_matches())
        );
        if !result.skipped_files.is_empty() {
            eprintln!(
                "  skipped    {}",
                self.yellow.apply_to(result.skipped_files.len())
            );
        }
        eprintln!();

        if !result.skipped_files.is_empty() {
            eprintln!("{}", self.yellow.apply_to("⚠ Skipped files:"));
            for skipped in result.skipped_files.iter().take(SKIPPED_SHOWN) {
                eprintln!("  {}", self.dim.apply_to(format!("• {skipped}")));
            }
            if result.skipped_files.len() > SKIPPED_SHOWN {
                eprintln!(
                    "  {}",
                    self.dim.apply_to(format!(
                        "... and {} more",
                        result.skipped_files.len() - SKIPPED_SHOWN
                    ))
                );
            }
            eprintln!();
        }
    }

    fn results(&self, result: &ExtractionResult, show_code: bool) {
        if result.total_matches() == 0 {
            println!(
                "{}",
                self.yellow.apply_to(format!(
                    "No code containing the tag '{}' was found",
                    result.config.tag()
                ))
            );
            return;
        }

        let grouped = result.group_by_file_and_line();
        println!(
            "{}",
            self.cyan
                .apply_to(format!("Found {} matches", result.total_matches()))
        );
        for (path, matches) in grouped.iter() {
            println!(
                "📄 {} {}",
                self.bold.apply_to(path.display()),
                self.dim.apply_to(format!("({} matches)", matches.len()))
            );
            for tagged in matches {
                println!(
                    "  {} {} {}",
                    tagged.kind(),
                    self.green.apply_to(tagged.name()),
                    self.dim.apply_to(format!("(line {})", tagged.line()))
                );
            }
        }
        println!();

        if !show_code {
            return;
        }
        for (path, matches) in grouped.iter() {
            println!("{}", self.cyan.apply_to(format!("./{}", path.display())));
            for tagged in matches {
                println!(
                    "\n{} {} {}",
                    self.yellow.apply_to(tagged.kind().as_str().to_uppercase()),
                    self.green.apply_to(tagged.name()),
                    self.dim.apply_to(format!("(line {})", tagged.line()))
                );
                for (n, line) in report::numbered_lines(tagged) {
                    println!("{} {line}", self.dim.apply_to(format!("{n:4} │")));
                }
            }
            println!();
        }
    }
}

impl Diagnostics for Printer {
    fn send(&mut self, msg: Message) {
        use Message::*;

        match msg {
            FindingFiles { root } => {
                self.progress
                    .enable_steady_tick(std::time::Duration::from_millis(1000 / 12));
                self.progress
                    .set_message(format!("Finding files in {}", root.display()));
            }
            FoundFiles { count } => {
                self.progress.set_message(format!("Found {count} files"));
            }
            ProcessingFile { path } => {
                self.progress.inc(1);
                self.progress
                    .set_message(format!("Searching {}", path.display()));
            }
            NoTagInFile { path } => log::trace!("no tag in {}", path.display()),
            FoundMatches { path, count } => {
                self.progress.println(format!(
                    "  {} {}",
                    self.green.apply_to(format!("{count:>3}")),
                    path.display()
                ));
            }
            SkippedFile { path, reason } => {
                self.progress.println(format!(
                    "  {} {} {}",
                    self.yellow.apply_to("  ⚠"),
                    path.display(),
                    self.dim.apply_to(reason)
                ));
            }
            Finished {
                processed,
                matches,
                skipped,
            } => {
                self.progress.finish_and_clear();
                log::debug!("processed {processed} files, {matches} matches, {skipped} skipped");
            }
        }
    }
}

fn main() {
    env_logger::builder().init();

    let cli = Cli::parse();
    log::debug!("{cli:#?}");

    let mut printer = Printer::new(cli.quiet);
    let config = match cli.config() {
        Ok(config) => config,
        Err(err) => {
            printer.error(&err);
            std::process::exit(1);
        }
    };
    printer.banner(&config);

    let result = TagExtractor::new(config, &mut printer).extract();
    printer.summary(&result);
    printer.results(&result, !cli.no_code);

    if let Some(output) = cli.output.as_ref() {
        if let Err(err) = report::save_to_file(&result, output, cli.format.into()) {
            printer.error(&err);
            std::process::exit(1);
        }
        eprintln!(
            "{} Saved the report to {}",
            printer.green.apply_to("✓"),
            printer.bold.apply_to(output.display())
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["tag_finder", "src"]).unwrap();
        assert_eq!(cli.tag, "TODO:");
        assert_eq!(cli.pattern, "*.py");
        assert!(matches!(cli.format, Format::Markdown));
        assert!(!cli.no_functions && !cli.no_classes && !cli.no_code && !cli.quiet);

        let cli = Cli::try_parse_from([
            "tag_finder",
            "src",
            "-t",
            "FIXME:",
            "--no-classes",
            "-f",
            "json",
            "-o",
            "out/report.json",
        ])
        .unwrap();
        assert_eq!(cli.tag, "FIXME:");
        assert!(cli.no_classes);
        assert_eq!(ReportFormat::from(cli.format), ReportFormat::Json);
        assert_eq!(cli.output, Some(PathBuf::from("out/report.json")));
    }
}

// Command-line front end for savepatch.
//
// One subcommand per game converts a save file. `table` prints the finalized
// patch table for a game and direction, `games` lists what is supported.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::converter::{ConvertOptions, ConvertStats, Pipeline};
use crate::format::ConvertFormat;
use crate::games::{self, GameId, SaveGame};
use crate::io;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Convert game saves between console and PC layouts.
#[derive(Parser, Debug)]
#[command(
    name = "savepatch",
    version,
    about = "Convert game saves between console and PC layouts",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Overwrite an existing output file.
    #[arg(long, global = true)]
    force: bool,

    /// Quiet mode (errors only).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use twice for debug logging).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Tales of Vesperia (PS3 <-> PC).
    Vesperia(VesperiaArgs),
    /// Trails of Cold Steel (PS4 <-> PC).
    #[command(name = "cold-steel-1")]
    ColdSteel1(ColdSteelArgs),
    /// Trails of Cold Steel II (PS4 <-> PC).
    #[command(name = "cold-steel-2")]
    ColdSteel2(ColdSteelArgs),
    /// Trails of Cold Steel III (PS4 <-> PC).
    #[command(name = "cold-steel-3")]
    ColdSteel3(ColdSteelArgs),
    /// Print the finalized patch table for a game and direction.
    Table(TableArgs),
    /// List supported games and conversion directions.
    Games,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VesperiaFormat {
    #[value(name = "ps3-to-pc")]
    Ps3ToPc,
    #[value(name = "pc-to-ps3")]
    PcToPs3,
}

impl VesperiaFormat {
    fn convert_format(self) -> ConvertFormat {
        match self {
            Self::Ps3ToPc => ConvertFormat::PS3_TO_PC,
            Self::PcToPs3 => ConvertFormat::PC_TO_PS3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColdSteelFormat {
    #[value(name = "ps4-to-pc")]
    Ps4ToPc,
    #[value(name = "pc-to-ps4")]
    PcToPs4,
}

impl ColdSteelFormat {
    fn convert_format(self) -> ConvertFormat {
        match self {
            Self::Ps4ToPc => ConvertFormat::PS4_TO_PC,
            Self::PcToPs4 => ConvertFormat::PC_TO_PS4,
        }
    }
}

#[derive(Args, Debug)]
struct IoArgs {
    /// Input save file.
    #[arg(short = 'i', long, value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output save file. Defaults to <input>.<target format>.
    #[arg(short = 'o', long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct VesperiaArgs {
    #[command(flatten)]
    io: IoArgs,

    /// Source and target layout.
    #[arg(short = 'f', long, value_enum, default_value = "ps3-to-pc")]
    convert_format: VesperiaFormat,

    /// Zero the DLC item bitfield so saves with DLC items load (default).
    #[arg(short = 'p', long, overrides_with = "no_patch_dlc_item_checks")]
    patch_dlc_item_checks: bool,

    /// Leave the DLC item bitfield untouched.
    #[arg(long, overrides_with = "patch_dlc_item_checks")]
    no_patch_dlc_item_checks: bool,
}

#[derive(Args, Debug)]
struct ColdSteelArgs {
    #[command(flatten)]
    io: IoArgs,

    /// Source and target layout.
    #[arg(short = 'f', long, value_enum, default_value = "ps4-to-pc")]
    convert_format: ColdSteelFormat,
}

#[derive(Args, Debug)]
struct TableArgs {
    /// Game to print the table for.
    game: GameId,

    /// Conversion direction, e.g. ps4-to-pc.
    #[arg(short = 'f', long)]
    convert_format: ConvertFormat,

    /// Input size to finalize against. Defaults to the game's save size.
    #[arg(long)]
    input_size: Option<usize>,

    /// Leave the Vesperia DLC item bitfield out of the table.
    #[arg(long)]
    no_patch_dlc_item_checks: bool,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Convert,
    Table,
    Games,
}

struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    game: Option<GameId>,
    format: Option<ConvertFormat>,
    patch_dlc_item_checks: bool,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    input_size: Option<usize>,
}

impl Options {
    fn bare(command: Command, cli: &Cli) -> Self {
        Self {
            command,
            force: cli.force,
            quiet: cli.quiet,
            verbose: cli.verbose.min(2),
            json_output: cli.json_output,
            game: None,
            format: None,
            patch_dlc_item_checks: true,
            input_file: None,
            output_file: None,
            input_size: None,
        }
    }

    fn convert(cli: &Cli, game: GameId, format: ConvertFormat, io: &IoArgs) -> Self {
        Self {
            game: Some(game),
            format: Some(format),
            input_file: Some(io.input.clone()),
            output_file: io.output.clone(),
            ..Self::bare(Command::Convert, cli)
        }
    }

    fn convert_options(&self, format: ConvertFormat) -> ConvertOptions {
        ConvertOptions {
            format,
            patch_dlc_item_checks: self.patch_dlc_item_checks,
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    match &cli.command {
        Cmd::Vesperia(args) => Options {
            patch_dlc_item_checks: args.patch_dlc_item_checks || !args.no_patch_dlc_item_checks,
            ..Options::convert(
                &cli,
                GameId::Vesperia,
                args.convert_format.convert_format(),
                &args.io,
            )
        },
        Cmd::ColdSteel1(args) => Options::convert(
            &cli,
            GameId::ColdSteel1,
            args.convert_format.convert_format(),
            &args.io,
        ),
        Cmd::ColdSteel2(args) => Options::convert(
            &cli,
            GameId::ColdSteel2,
            args.convert_format.convert_format(),
            &args.io,
        ),
        Cmd::ColdSteel3(args) => Options::convert(
            &cli,
            GameId::ColdSteel3,
            args.convert_format.convert_format(),
            &args.io,
        ),
        Cmd::Table(args) => Options {
            game: Some(args.game),
            format: Some(args.convert_format),
            input_size: args.input_size,
            patch_dlc_item_checks: !args.no_patch_dlc_item_checks,
            ..Options::bare(Command::Table, &cli)
        },
        Cmd::Games => Options::bare(Command::Games, &cli),
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("savepatch".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

fn log_level(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Game and direction of a convert/table command, or an exit code.
fn selected(opts: &Options) -> Result<(&'static dyn SaveGame, ConvertFormat), i32> {
    let (Some(id), Some(format)) = (opts.game, opts.format) else {
        eprintln!("savepatch: no game selected");
        return Err(1);
    };
    let game = games::lookup(id);
    if let Err(e) = game.check_format(format) {
        eprintln!("savepatch: {e}");
        return Err(1);
    }
    Ok((game, format))
}

fn print_json(json: &serde_json::Value) {
    eprintln!("{}", serde_json::to_string_pretty(json).unwrap_or_default());
}

// ---------------------------------------------------------------------------
// Convert command
// ---------------------------------------------------------------------------

fn stats_json(stats: &ConvertStats, output: &std::path::Path) -> serde_json::Value {
    let digest = |d: &Option<[u8; 32]>| d.as_ref().map(|d| io::hex(d));
    serde_json::json!({
        "command": "convert",
        "game": stats.game.slug(),
        "format": stats.format.to_string(),
        "output": output.display().to_string(),
        "input_size": stats.input_size,
        "decompressed_size": stats.decompressed_size,
        "output_size": stats.output_size,
        "table_entries": stats.table_entries,
        "entries_applied": stats.entries_applied,
        "input_sha256": digest(&stats.input_sha256),
        "output_sha256": digest(&stats.output_sha256),
    })
}

fn cmd_convert(opts: &Options) -> i32 {
    let (game, format) = match selected(opts) {
        Ok(sel) => sel,
        Err(code) => return code,
    };
    let Some(input) = opts.input_file.clone() else {
        eprintln!("savepatch: an input file is required");
        return 1;
    };

    let output = opts
        .output_file
        .clone()
        .unwrap_or_else(|| io::default_output_path(&input, format.target));
    if output.exists() && !opts.force {
        eprintln!(
            "savepatch: output file exists, use --force to overwrite: {}",
            output.display()
        );
        return 1;
    }

    let mut pipeline =
        Pipeline::new(game, opts.convert_options(format), input, Some(output)).overwrite(opts.force);
    let stats = match pipeline.run() {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("savepatch: {} {format}: {e}", game.id());
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "savepatch: {} {format}: input size: {}, output size: {}, entries: {}/{}",
            game.id(),
            stats.input_size,
            stats.output_size,
            stats.entries_applied,
            stats.table_entries
        );
    }

    if opts.json_output {
        print_json(&stats_json(&stats, pipeline.output_path()));
    }

    0
}

// ---------------------------------------------------------------------------
// Table command
// ---------------------------------------------------------------------------

fn cmd_table(opts: &Options) -> i32 {
    let (game, format) = match selected(opts) {
        Ok(sel) => sel,
        Err(code) => return code,
    };
    let Some(input_len) = opts.input_size.or_else(|| game.expected_input_size(format)) else {
        eprintln!("savepatch: {}: no known save size for {format}", game.id());
        return 1;
    };

    let table = match game.patch_table(&opts.convert_options(format), input_len) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("savepatch: {e}");
            return 1;
        }
    };

    let net_delta = table.net_delta();
    let entries = table.into_entries();

    for (index, entry) in entries.iter().enumerate() {
        println!("{index:5}  {entry}  {:+}", entry.size_delta());
    }

    if !opts.quiet {
        eprintln!(
            "savepatch: {} {format}: {} entries over {input_len} bytes, net delta {net_delta:+}",
            game.id(),
            entries.len(),
        );
    }

    if opts.json_output {
        let entries: Vec<_> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "start": e.range.start,
                    "end": e.range.end,
                    "op": e.op.name(),
                    "delta": e.size_delta(),
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "command": "table",
            "game": game.id().slug(),
            "format": format.to_string(),
            "input_size": input_len,
            "net_delta": net_delta,
            "entries": entries,
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Games command
// ---------------------------------------------------------------------------

fn cmd_games(opts: &Options) -> i32 {
    for game in games::all() {
        let formats: Vec<String> = game
            .supported_formats()
            .iter()
            .map(ToString::to_string)
            .collect();
        println!(
            "{:<14} {:<26} {}",
            game.id().slug(),
            game.id().title(),
            formats.join(", ")
        );
    }

    if opts.json_output {
        let list: Vec<_> = games::all()
            .map(|game| {
                let formats: Vec<_> = game
                    .supported_formats()
                    .iter()
                    .map(|f| {
                        serde_json::json!({
                            "format": f.to_string(),
                            "input_size": game.expected_input_size(*f),
                        })
                    })
                    .collect();
                serde_json::json!({
                    "game": game.id().slug(),
                    "title": game.id().title(),
                    "formats": formats,
                })
            })
            .collect();
        print_json(&serde_json::json!({ "command": "games", "games": list }));
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Convert => cmd_convert(&opts),
        Command::Table => cmd_table(&opts),
        Command::Games => cmd_games(&opts),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("savepatch".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect()
    }

    fn parse_opts(args: &[&str]) -> Options {
        let cli = Cli::try_parse_from(argv(args)).expect("cli parse failed");
        resolve_options(cli)
    }

    #[test]
    fn vesperia_defaults() {
        let opts = parse_opts(&["vesperia", "-i", "SAVE"]);
        assert_eq!(opts.command, Command::Convert);
        assert_eq!(opts.game, Some(GameId::Vesperia));
        assert_eq!(opts.format, Some(ConvertFormat::PS3_TO_PC));
        assert!(opts.patch_dlc_item_checks);
        assert_eq!(opts.input_file, Some(PathBuf::from("SAVE")));
        assert_eq!(opts.output_file, None);
    }

    #[test]
    fn dlc_toggle_last_flag_wins() {
        let off = parse_opts(&["vesperia", "-i", "SAVE", "--no-patch-dlc-item-checks"]);
        assert!(!off.patch_dlc_item_checks);

        let on = parse_opts(&[
            "vesperia",
            "-i",
            "SAVE",
            "--no-patch-dlc-item-checks",
            "--patch-dlc-item-checks",
        ]);
        assert!(on.patch_dlc_item_checks);
    }

    #[test]
    fn cold_steel_subcommands_map() {
        let opts = parse_opts(&[
            "cold-steel-3",
            "-i",
            "data.dat",
            "-o",
            "out.ps4",
            "-f",
            "pc-to-ps4",
        ]);
        assert_eq!(opts.game, Some(GameId::ColdSteel3));
        assert_eq!(opts.format, Some(ConvertFormat::PC_TO_PS4));
        assert_eq!(opts.output_file, Some(PathBuf::from("out.ps4")));

        assert_eq!(
            parse_opts(&["cold-steel-1", "-i", "x"]).format,
            Some(ConvertFormat::PS4_TO_PC)
        );
        assert_eq!(parse_opts(&["cold-steel-2", "-i", "x"]).game, Some(GameId::ColdSteel2));
    }

    #[test]
    fn direction_is_limited_per_game() {
        assert!(Cli::try_parse_from(argv(&["cold-steel-2", "-i", "x", "-f", "ps3-to-pc"])).is_err());
        assert!(Cli::try_parse_from(argv(&["vesperia", "-i", "x", "-f", "ps4-to-pc"])).is_err());
        assert!(Cli::try_parse_from(argv(&["vesperia", "-f", "pc-to-ps3"])).is_err());
    }

    #[test]
    fn global_flags() {
        let opts = parse_opts(&["--force", "--json", "vesperia", "-i", "SAVE"]);
        assert!(opts.force);
        assert!(opts.json_output);

        let verbose = parse_opts(&["-vvv", "games"]);
        assert_eq!(verbose.verbose, 2);
        assert_eq!(log_level(&verbose), "debug");
        assert_eq!(log_level(&parse_opts(&["-q", "games"])), "error");
        assert_eq!(log_level(&parse_opts(&["games"])), "warn");
        assert!(Cli::try_parse_from(argv(&["-q", "-v", "games"])).is_err());
    }

    #[test]
    fn table_command_maps() {
        let opts = parse_opts(&[
            "table",
            "cold-steel-1",
            "-f",
            "pc-to-ps4",
            "--input-size",
            "1024",
        ]);
        assert_eq!(opts.command, Command::Table);
        assert_eq!(opts.game, Some(GameId::ColdSteel1));
        assert_eq!(opts.format, Some(ConvertFormat::PC_TO_PS4));
        assert_eq!(opts.input_size, Some(1024));
        assert!(Cli::try_parse_from(argv(&["table", "cold-steel-9", "-f", "ps4-to-pc"])).is_err());
    }

    #[test]
    fn table_rejects_unsupported_direction() {
        let opts = parse_opts(&["-q", "table", "vesperia", "-f", "ps4-to-pc"]);
        assert_eq!(cmd_table(&opts), 1);
    }

    #[test]
    fn fuzz_parse_does_not_panic() {
        fuzz_try_parse_args(&["table".into(), "--input-size".into(), "-1".into()]);
        fuzz_try_parse_args(&["cold-steel-3".into(), "-f".into()]);
        fuzz_try_parse_args(&[]);
    }
}

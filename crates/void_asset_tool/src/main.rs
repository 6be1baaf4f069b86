//! void-assets - command line host for the asset database
//!
//! ```text
//! void-assets [--config FILE] [--root DIR] <command> [args]
//!
//!   rebuild [--force]       rescan and build every content tree
//!   list                    print the asset trees
//!   info <path|uid>         show one asset
//!   copy <src> <dst>        copy an asset (fresh UIDs)
//!   move <src> <dst>        move an asset
//!   rename <src> <name>     rename an asset within its folder
//!   remove <path|uid>       delete an asset and its sidecar
//!   import <path>           write a sidecar for an unimported file or folder
//!   unique <path>           print the first free copy name
//!   watch                   rebuild whenever a content root changes
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use void_asset::{AssetError, AssetLocator, AssetResult, AssetStore, AssetTree, AssetsConfig, Uid};

const USAGE: &str = "usage: void-assets [--config FILE] [--root DIR] \
<rebuild [--force] | list | info <asset> | copy <src> <dst> | move <src> <dst> | \
rename <src> <name> | remove <asset> | import <path> | unique <path> | watch>";

/// Parsed command line
struct Cli {
    config: Option<PathBuf>,
    root: Option<PathBuf>,
    command: String,
    args: Vec<String>,
}

impl Cli {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut config = None;
        let mut root = None;
        let mut positional = Vec::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => config = Some(args.next().ok_or("--config needs a file")?.into()),
                "--root" => root = Some(args.next().ok_or("--root needs a directory")?.into()),
                "-h" | "--help" => return Err(USAGE.to_string()),
                _ => positional.push(arg),
            }
        }

        if positional.is_empty() {
            return Err(USAGE.to_string());
        }
        let command = positional.remove(0);
        Ok(Self {
            config,
            root,
            command,
            args: positional,
        })
    }

    fn arg(&self, index: usize) -> Result<&str, String> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| format!("{} expects more arguments\n{}", self.command, USAGE))
    }

    fn load_config(&self) -> AssetResult<AssetsConfig> {
        let mut config = match &self.config {
            Some(path) => AssetsConfig::load_from_file(path)?,
            None => AssetsConfig::load(),
        };
        if let Some(root) = &self.root {
            config.project_root = root.clone();
        }
        Ok(config)
    }
}

/// A UID when the argument parses as one, a path otherwise
fn locator(arg: &str) -> AssetLocator<'_> {
    arg.parse::<Uid>()
        .map(AssetLocator::Uid)
        .unwrap_or(AssetLocator::Path(arg))
}

fn print_tree(tree: &AssetTree) {
    let mut stack: Vec<(usize, Uid)> = tree.roots().map(|n| (0, n.uid)).collect();
    stack.reverse();

    while let Some((depth, uid)) = stack.pop() {
        let Some(node) = tree.find_asset(uid) else {
            continue;
        };
        println!("{:indent$}{}  [{}] {}", "", node.name(), node.asset_type, node.uid, indent = depth * 2);

        let mut children: Vec<(usize, Uid)> = tree.children_of(uid).map(|c| (depth + 1, c.uid)).collect();
        children.reverse();
        stack.extend(children);
    }
}

fn report(done: bool) -> ExitCode {
    if done {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(cli: &Cli) -> Result<ExitCode, String> {
    let config = cli.load_config().map_err(|e| e.to_string())?;
    let mut store = AssetStore::new(config).map_err(|e| e.to_string())?;
    let err = |e: AssetError| e.to_string();

    let code = match cli.command.as_str() {
        "rebuild" => {
            let forcible = cli.args.iter().any(|a| a == "--force");
            let changed = store.rebuild_assets(forcible).map_err(err)?;
            println!("{} assets changed", changed.len());
            for uid in changed {
                println!("  {} {}", uid, store.get_asset_path(uid).unwrap_or_default());
            }
            ExitCode::SUCCESS
        }
        "list" => {
            for tree in store.trees() {
                println!("{}", tree.root_path().display());
                print_tree(tree);
            }
            ExitCode::SUCCESS
        }
        "info" => match store.get_asset_info(locator(cli.arg(0)?)) {
            Some(info) => {
                println!("path: {}", info.path);
                println!("uid:  {}", info.uid);
                println!("type: {}", info.asset_type);
                for (key, value) in &info.meta.params {
                    println!("  {} = {}", key, value);
                }
                ExitCode::SUCCESS
            }
            None => {
                log::error!("Asset not found: {}", cli.arg(0)?);
                ExitCode::FAILURE
            }
        },
        "copy" => report(store.copy_asset(locator(cli.arg(0)?), cli.arg(1)?, true).map_err(err)?),
        "move" => report(store.move_asset(locator(cli.arg(0)?), cli.arg(1)?, true).map_err(err)?),
        "rename" => report(store.rename_asset(locator(cli.arg(0)?), cli.arg(1)?, true).map_err(err)?),
        "remove" => report(store.remove_asset(locator(cli.arg(0)?), true).map_err(err)?),
        "import" => match store.import_asset(cli.arg(0)?, true).map_err(err)? {
            Some(uid) => {
                println!("{}", uid);
                ExitCode::SUCCESS
            }
            None => ExitCode::FAILURE,
        },
        "unique" => {
            println!("{}", store.make_unique_asset_name(cli.arg(0)?));
            ExitCode::SUCCESS
        }
        "watch" => watch(&mut store)?,
        other => return Err(format!("unknown command: {}\n{}", other, USAGE)),
    };
    Ok(code)
}

#[cfg(feature = "file-watcher")]
fn watch(store: &mut AssetStore) -> Result<ExitCode, String> {
    store.watch().map_err(|e| e.to_string())?;
    log::info!("Watching for changes, press Ctrl-C to stop");

    loop {
        match store.update() {
            Ok(Some(changed)) => println!("{} assets changed", changed.len()),
            Ok(None) => {}
            Err(e) => log::error!("Rebuild failed: {}", e),
        }
        std::thread::sleep(std::time::Duration::from_millis(250));
    }
}

#[cfg(not(feature = "file-watcher"))]
fn watch(_store: &mut AssetStore) -> Result<ExitCode, String> {
    Err("built without the file-watcher feature".to_string())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let cli = match Cli::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    match run(&cli) {
        Ok(code) => code,
        Err(message) => {
            log::error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

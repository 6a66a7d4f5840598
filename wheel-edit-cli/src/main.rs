//! Command-line front-end for `wheel-edit-core`.
//!
//! Edits wheel metadata without extracting and repacking the whole archive,
//! by copying every unchanged member as raw compressed bytes.

use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use wheel_edit_core::WheelEditor;

#[derive(Parser)]
#[command(name = "editwheel", version, about = "High-performance Python wheel metadata editor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display wheel metadata.
    Show {
        /// Path to a .whl file to inspect.
        wheel: PathBuf,

        /// Output as JSON.
        #[arg(long = "json")]
        as_json: bool,

        /// Show only specific field(s). Can be repeated.
        #[arg(long, short = 'f')]
        field: Vec<String>,
    },

    /// Edit wheel metadata fields and save.
    Edit {
        /// Path to a .whl file to edit.
        wheel: PathBuf,

        /// Output path (default: overwrite in-place).
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Set package name.
        #[arg(long = "name")]
        name: Option<String>,

        /// Set version.
        #[arg(long)]
        version: Option<String>,

        /// Set summary/description.
        #[arg(long)]
        summary: Option<String>,

        /// Set author name.
        #[arg(long)]
        author: Option<String>,

        /// Set author email.
        #[arg(long = "author-email")]
        author_email: Option<String>,

        /// Set license.
        #[arg(long = "license")]
        license: Option<String>,

        /// Set Python version requirement (e.g. ">=3.8").
        #[arg(long = "requires-python")]
        requires_python: Option<String>,

        /// Add a classifier. Can be repeated.
        #[arg(long = "add-classifier")]
        add_classifier: Vec<String>,

        /// Replace all classifiers (comma-separated).
        #[arg(long = "set-classifiers")]
        set_classifiers: Option<String>,

        /// Add a dependency. Can be repeated.
        #[arg(long = "add-requires-dist")]
        add_requires_dist: Vec<String>,

        /// Replace all dependencies (comma-separated).
        #[arg(long = "set-requires-dist")]
        set_requires_dist: Option<String>,

        /// Set RPATH for ELF files matching PATTERN. Can be repeated.
        /// Example: --set-rpath 'torch/lib/*.so' '$ORIGIN'
        #[arg(long = "set-rpath", num_args = 2, value_names = ["PATTERN", "RPATH"])]
        set_rpath: Vec<String>,

        /// Set the platform tag for the wheel (e.g. "manylinux_2_28_x86_64").
        #[arg(long = "platform-tag")]
        platform_tag: Option<String>,

        /// Set the python tag for the wheel (e.g. "py3").
        #[arg(long = "python-tag")]
        python_tag: Option<String>,

        /// Set the abi tag for the wheel (e.g. "abi3").
        #[arg(long = "abi-tag")]
        abi_tag: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Show { wheel, as_json, field } => show(&wheel, as_json, &field),
        Commands::Edit {
            wheel,
            output,
            name,
            version,
            summary,
            author,
            author_email,
            license,
            requires_python,
            add_classifier,
            set_classifiers,
            add_requires_dist,
            set_requires_dist,
            set_rpath,
            platform_tag,
            python_tag,
            abi_tag,
        } => edit(EditArgs {
            wheel,
            output,
            name,
            version,
            summary,
            author,
            author_email,
            license,
            requires_python,
            add_classifier,
            set_classifiers,
            add_requires_dist,
            set_requires_dist,
            set_rpath,
            platform_tag,
            python_tag,
            abi_tag,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn show(wheel: &Path, as_json: bool, fields: &[String]) -> anyhow::Result<()> {
    let editor = WheelEditor::open(wheel).map_err(|e| anyhow::anyhow!("{e}"))?;

    let mut metadata: Vec<(&str, serde_json::Value)> = vec![
        ("name", opt_str(editor.name())),
        ("version", opt_str(editor.version())),
        ("summary", opt_str(editor.summary())),
        ("author", opt_str(editor.author())),
        ("author_email", opt_str(editor.author_email())),
        ("license", opt_str(editor.license())),
        ("requires_python", opt_str(editor.requires_python())),
        ("classifiers", str_list(editor.classifiers())),
        ("requires_dist", str_list(editor.requires_dist())),
        ("project_urls", project_urls_value(editor.project_urls())),
        ("platform_tag", opt_str(editor.platform_tag())),
    ];

    if !fields.is_empty() {
        let known: HashSet<&str> = metadata.iter().map(|(k, _)| *k).collect();
        for f in fields {
            let normalized = f.replace('-', "_").to_lowercase();
            if !known.contains(normalized.as_str()) {
                return Err(wheel_edit_core::Error::UnknownField(f.clone()).into());
            }
        }
        let wanted: HashSet<String> = fields.iter().map(|f| f.replace('-', "_").to_lowercase()).collect();
        metadata.retain(|(k, _)| wanted.contains(*k));
    }

    if as_json {
        let map: serde_json::Map<String, serde_json::Value> =
            metadata.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        for (key, value) in &metadata {
            print_human(key, value);
        }
    }

    Ok(())
}

fn opt_str(value: Option<&str>) -> serde_json::Value {
    match value {
        Some(s) => serde_json::Value::String(s.to_string()),
        None => serde_json::Value::Null,
    }
}

fn str_list(values: Vec<&str>) -> serde_json::Value {
    serde_json::Value::Array(values.into_iter().map(|s| serde_json::Value::String(s.to_string())).collect())
}

fn project_urls_value(urls: Vec<(String, String)>) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> =
        urls.into_iter().map(|(label, url)| (label, serde_json::Value::String(url))).collect();
    serde_json::Value::Object(map)
}

fn print_human(key: &str, value: &serde_json::Value) {
    match value {
        serde_json::Value::Null => {}
        serde_json::Value::Array(items) => {
            if !items.is_empty() {
                println!("{key}:");
                for item in items {
                    println!("  - {}", item.as_str().unwrap_or_default());
                }
            }
        }
        serde_json::Value::Object(map) => {
            if !map.is_empty() {
                println!("{key}:");
                for (label, url) in map {
                    println!("  - {label}: {}", url.as_str().unwrap_or_default());
                }
            }
        }
        serde_json::Value::String(s) => println!("{key}: {s}"),
        other => println!("{key}: {other}"),
    }
}

struct EditArgs {
    wheel: PathBuf,
    output: Option<PathBuf>,
    name: Option<String>,
    version: Option<String>,
    summary: Option<String>,
    author: Option<String>,
    author_email: Option<String>,
    license: Option<String>,
    requires_python: Option<String>,
    add_classifier: Vec<String>,
    set_classifiers: Option<String>,
    add_requires_dist: Vec<String>,
    set_requires_dist: Option<String>,
    set_rpath: Vec<String>,
    platform_tag: Option<String>,
    python_tag: Option<String>,
    abi_tag: Option<String>,
}

fn edit(args: EditArgs) -> anyhow::Result<()> {
    let mut editor = WheelEditor::open(&args.wheel).map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut changes_made = false;

    if let Some(v) = args.name {
        editor.set_name(v);
        changes_made = true;
    }
    if let Some(v) = args.version {
        editor.set_version(v);
        changes_made = true;
    }
    if let Some(v) = args.summary {
        editor.set_summary(v);
        changes_made = true;
    }
    if let Some(v) = args.author {
        editor.set_author(v);
        changes_made = true;
    }
    if let Some(v) = args.author_email {
        editor.set_author_email(v);
        changes_made = true;
    }
    if let Some(v) = args.license {
        editor.set_license(v);
        changes_made = true;
    }
    if let Some(v) = args.requires_python {
        editor.set_requires_python(v);
        changes_made = true;
    }

    if let Some(csv) = args.set_classifiers {
        editor.set_classifiers(split_commas(&csv));
        changes_made = true;
    } else if !args.add_classifier.is_empty() {
        for c in args.add_classifier {
            editor.add_classifier(c);
        }
        changes_made = true;
    }

    if let Some(csv) = args.set_requires_dist {
        editor.set_requires_dist(split_commas(&csv));
        changes_made = true;
    } else if !args.add_requires_dist.is_empty() {
        for d in args.add_requires_dist {
            editor.add_requires_dist(d);
        }
        changes_made = true;
    }

    for pair in args.set_rpath.chunks_exact(2) {
        let (pattern, rpath) = (&pair[0], &pair[1]);
        let count = editor
            .set_rpath(pattern, rpath)
            .map_err(|e| anyhow::anyhow!("setting RPATH for '{pattern}': {e}"))?;
        println!("Set RPATH on {count} file(s) matching '{pattern}'");
        if count > 0 {
            changes_made = true;
        }
    }

    if let Some(v) = args.platform_tag {
        println!("Set platform tag to: {v}");
        editor.set_platform_tag(v);
        changes_made = true;
    }
    if let Some(v) = args.python_tag {
        println!("Set python tag to: {v}");
        editor.set_python_tag(v);
        changes_made = true;
    }
    if let Some(v) = args.abi_tag {
        println!("Set abi tag to: {v}");
        editor.set_abi_tag(v);
        changes_made = true;
    }

    if !changes_made {
        anyhow::bail!("No changes specified. Use --help to see available options.");
    }

    editor.save(args.output.as_deref()).map_err(|e| anyhow::anyhow!("saving wheel: {e}"))?;

    match &args.output {
        Some(path) => println!("Saved to: {}", path.display()),
        None => println!("Updated: {}", args.wheel.display()),
    }

    Ok(())
}

fn split_commas(csv: &str) -> Vec<String> {
    csv.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

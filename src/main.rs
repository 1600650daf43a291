use anyhow::{Context as _, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{debug, info};

use miniphrase::{Locale, RendererConfig, SourceFormat};

fn cli() -> Command {
    let locale = Arg::new("locale")
        .long("locale")
        .short('l')
        .help("Target locale (default: the configured default locale)");

    Command::new("miniphrase")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Render localized rich-text messages from a translations directory")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("JSON config file; MINIPHRASE_* variables override it"),
        )
        .arg(
            Arg::new("dir")
                .long("dir")
                .short('d')
                .global(true)
                .help("Translations directory"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .global(true)
                .value_parser(clap::value_parser!(SourceFormat))
                .help("Translation file format"),
        )
        .arg(
            Arg::new("default-locale")
                .long("default-locale")
                .global(true)
                .help("Locale used when none is given"),
        )
        .subcommand(
            Command::new("render")
                .about("Render a message")
                .arg(Arg::new("key").required(true).index(1))
                .arg(locale.clone())
                .arg(
                    Arg::new("set")
                        .long("set")
                        .short('s')
                        .action(ArgAction::Append)
                        .help("Unparsed placeholder, name=value"),
                )
                .arg(
                    Arg::new("markup")
                        .long("markup")
                        .short('m')
                        .action(ArgAction::Append)
                        .help("Parsed placeholder, name=value"),
                )
                .arg(
                    Arg::new("no-phrase")
                        .long("no-phrase")
                        .help("Do not install the phrase tag")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("fallback")
                        .long("fallback")
                        .help("Fall back to the default locale for missing translations")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("lines")
                        .long("lines")
                        .help("Render a list translation line by line")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the text tree as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("lookup")
                .about("Print the raw template of a message")
                .arg(Arg::new("key").required(true).index(1))
                .arg(locale),
        )
        .subcommand(Command::new("locales").about("List the locales with translations"))
}

fn load_config(matches: &ArgMatches) -> Result<RendererConfig> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => RendererConfig::from_json_file(path)?,
        None => RendererConfig::default(),
    };
    let mut config = config.with_env()?;

    if let Some(dir) = matches.get_one::<String>("dir") {
        config.translations = Some(dir.into());
    }
    if let Some(format) = matches.get_one::<SourceFormat>("format") {
        config.format = *format;
    }
    if let Some(locale) = matches.get_one::<String>("default-locale") {
        config.default_locale = locale.clone();
    }
    Ok(config)
}

/// Split `name=value` placeholder arguments.
fn placeholders(matches: &ArgMatches, id: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for raw in matches.get_many::<String>(id).unwrap_or_default() {
        let Some((name, value)) = raw.split_once('=') else {
            bail!("Placeholder '{}' must be written as name=value", raw);
        };
        pairs.push((name.trim().to_string(), value.to_string()));
    }
    Ok(pairs)
}

fn target_locale(matches: &ArgMatches) -> Option<Locale> {
    matches.get_one::<String>("locale").map(|l| Locale::new(l))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let mut config = load_config(&matches)?;
    if let Some(("render", sub)) = matches.subcommand() {
        if sub.get_flag("no-phrase") {
            config.include_phrase_tag = false;
        }
        if sub.get_flag("fallback") {
            config.fallback_to_default_locale = true;
        }
    }
    debug!(?config, "configuration loaded");

    let renderer = config.renderer()?;
    if config.translations.is_some() {
        renderer
            .store()
            .reload()
            .await
            .context("Failed to load translations")?;
    } else {
        info!("no translations directory configured");
    }

    match matches.subcommand() {
        Some(("render", sub)) => {
            let key = sub
                .get_one::<String>("key")
                .context("missing message key")?;
            let locale = target_locale(sub);
            let unparsed = placeholders(sub, "set")?;
            let parsed = placeholders(sub, "markup")?;
            let configure = |tags: &mut miniphrase::TagRegistryBuilder| {
                for (name, value) in &unparsed {
                    tags.unparsed(name, value);
                }
                for (name, value) in &parsed {
                    tags.parsed(name, value);
                }
            };

            let nodes = if sub.get_flag("lines") {
                renderer.render_lines_with(key, locale.as_ref(), configure)?
            } else {
                vec![renderer.render_with(key, locale.as_ref(), configure)?]
            };

            for node in &nodes {
                if sub.get_flag("json") {
                    println!("{}", serde_json::to_string_pretty(node)?);
                } else {
                    println!("{}", node.plain_text());
                }
            }
        }
        Some(("lookup", sub)) => {
            let key = sub
                .get_one::<String>("key")
                .context("missing message key")?;
            let locale = renderer.target_locale(target_locale(sub).as_ref());
            match renderer.translation(key, &locale) {
                Some(template) => println!("{}", template),
                None => bail!("No translation for '{}' in {}", key, locale),
            }
        }
        Some(("locales", _)) => {
            for locale in renderer.store().locales() {
                println!("{}", locale);
            }
        }
        _ => unreachable!("a subcommand is required"),
    }

    Ok(())
}

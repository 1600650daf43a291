//! End-to-end rendering over translation directories on disk.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use miniphrase::{
    Audience, Audiences, DeliveryError, HasLocale, JsonSource, Locale, PropertiesSource,
    RenderError, Renderer, RendererConfig, SourceFormat, TextNode, TranslationStore,
};

struct Translations {
    dir: TempDir,
}

impl Translations {
    fn new(files: &[(&str, &str)]) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let translations = Translations { dir };
        for (name, content) in files {
            translations.write(name, content)?;
        }
        Ok(translations)
    }

    fn write(&self, name: &str, content: &str) -> Result<()> {
        std::fs::write(self.dir.path().join(name), content)?;
        Ok(())
    }

    async fn renderer(&self) -> Result<Renderer> {
        let store = TranslationStore::new(PropertiesSource::new(self.dir.path()));
        store.reload().await?;
        Ok(Renderer::builder().store(store).build()?)
    }
}

const EN: &str = "\
# Greetings
greeting=Hello, <name>!
a=See <phrase:b>
b=the manual
rules=<bold>No griefing</bold>\\n<red>No spam</red>
";

const FR: &str = "\
greeting = Bonjour, <name> !
b = le manuel
";

#[tokio::test]
async fn test_greeting() -> Result<()> {
    let translations = Translations::new(&[("en.properties", EN)])?;
    let renderer = translations.renderer().await?;

    let node = renderer.render_with("greeting", Some(&Locale::new("en")), |tags| {
        tags.unparsed("name", "Ada");
    })?;
    assert_eq!(node, TextNode::text("Hello, Ada!"));
    Ok(())
}

#[tokio::test]
async fn test_phrase_reference() -> Result<()> {
    let translations = Translations::new(&[("en.properties", EN)])?;
    let renderer = translations.renderer().await?;

    assert_eq!(
        renderer.render("a", Some(&Locale::new("en")))?.plain_text(),
        "See the manual"
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_locale_echoes_key() -> Result<()> {
    let translations = Translations::new(&[("en.properties", EN), ("fr.properties", FR)])?;
    let renderer = translations.renderer().await?;

    assert_eq!(
        renderer.render("x", Some(&Locale::new("fr")))?,
        TextNode::text("x")
    );
    assert_eq!(
        renderer.render("a", Some(&Locale::new("fr")))?,
        TextNode::text("a")
    );
    Ok(())
}

#[tokio::test]
async fn test_phrase_with_markup_key_stays_literal() -> Result<()> {
    let translations =
        Translations::new(&[("en.properties", "broken=Read <phrase:'<bold>gone</bold>'>\n")])?;
    let renderer = translations.renderer().await?;

    let node = renderer.render("broken", None)?;
    assert_eq!(node, TextNode::text("Read <bold>gone</bold>"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_phrase_locale_fails_render() -> Result<()> {
    let translations = Translations::new(&[("en.properties", "bad=<phrase:b:???>\n")])?;
    let renderer = translations.renderer().await?;

    let Err(RenderError::Parse(error)) = renderer.render("bad", None) else {
        panic!("expected a parse error");
    };
    let argument = error.argument().expect("error names the argument");
    assert_eq!(argument.index, 1);
    assert_eq!(argument.value, "???");
    Ok(())
}

#[tokio::test]
async fn test_list_translation() -> Result<()> {
    let translations = Translations::new(&[("en.properties", EN)])?;
    let renderer = translations.renderer().await?;

    let lines: Vec<String> = renderer
        .render_lines("rules", None)?
        .iter()
        .map(TextNode::plain_text)
        .collect();
    assert_eq!(lines, vec!["No griefing", "No spam"]);
    Ok(())
}

#[tokio::test]
async fn test_reload_replaces_every_locale() -> Result<()> {
    let translations = Translations::new(&[("en.properties", EN), ("fr.properties", FR)])?;
    let renderer = translations.renderer().await?;
    let before = renderer.store().snapshot();

    translations.write("en.properties", "b=the new manual\n")?;
    translations.write("fr.properties", "b=le nouveau manuel\n")?;
    renderer.store().reload().await?;

    let en = Locale::new("en");
    let fr = Locale::new("fr");
    assert_eq!(before.get("b", &en), Some("the manual"));
    assert_eq!(before.get("b", &fr), Some("le manuel"));
    assert_eq!(renderer.store().lookup("b", &en).as_deref(), Some("the new manual"));
    assert_eq!(renderer.store().lookup("b", &fr).as_deref(), Some("le nouveau manuel"));
    assert_eq!(renderer.store().lookup("greeting", &en), None);
    Ok(())
}

#[tokio::test]
async fn test_broken_file_keeps_old_snapshot() -> Result<()> {
    let translations = Translations::new(&[("en.properties", EN)])?;
    let renderer = translations.renderer().await?;

    translations.write("en.properties", "oops=\\uXYZW\n")?;
    assert!(renderer.store().reload().await.is_err());
    assert_eq!(renderer.render("b", None)?.plain_text(), "the manual");
    Ok(())
}

#[tokio::test]
async fn test_json_directory() -> Result<()> {
    let translations = Translations::new(&[(
        "en.json",
        r#"{"@metadata": {"authors": []}, "greeting": "Hi <name>", "b": "json manual"}"#,
    )])?;
    let store = TranslationStore::new(JsonSource::new(translations.dir.path()));
    store.reload().await?;
    let renderer = Renderer::builder().store(store).build()?;

    assert_eq!(renderer.render("b", None)?.plain_text(), "json manual");
    assert_eq!(renderer.render("@metadata", None)?, TextNode::text("@metadata"));
    Ok(())
}

#[tokio::test]
async fn test_config_file() -> Result<()> {
    let translations = Translations::new(&[("en.properties", EN), ("fr.properties", FR)])?;
    let config_path = translations.dir.path().join("miniphrase.json");
    let config = serde_json::json!({
        "default_locale": "fr",
        "fallback_to_default_locale": true,
        "translations": translations.dir.path(),
    });
    std::fs::write(&config_path, config.to_string())?;

    let config = RendererConfig::from_json_file(&config_path)?;
    assert_eq!(config.format, SourceFormat::Properties);
    let renderer = config.renderer()?;
    renderer.store().reload().await?;

    // no German translations: falls back to French
    let node = renderer.render_with("greeting", Some(&Locale::new("de")), |tags| {
        tags.unparsed("name", "Ada");
    })?;
    assert_eq!(node.plain_text(), "Bonjour, Ada !");
    Ok(())
}

struct Member {
    name: &'static str,
    locale: &'static str,
    received: Mutex<Vec<String>>,
}

impl HasLocale for Member {
    fn locale(&self) -> Option<Locale> {
        Some(Locale::new(self.locale))
    }
}

impl Audience for Member {
    fn send_message(&self, message: &TextNode) -> Result<(), DeliveryError> {
        self.received
            .lock()
            .map_err(|_| DeliveryError::new("poisoned"))?
            .push(message.plain_text());
        Ok(())
    }
}

struct Bot;

impl HasLocale for Bot {}

impl Audience for Bot {
    fn send_message(&self, _: &TextNode) -> Result<(), DeliveryError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_contextual_fan_out() -> Result<()> {
    let translations = Translations::new(&[("en.properties", EN), ("fr.properties", FR)])?;
    let renderer = translations.renderer().await?;

    let ada = Arc::new(Member {
        name: "Ada",
        locale: "en",
        received: Mutex::new(Vec::new()),
    });
    let jean = Arc::new(Member {
        name: "Jean",
        locale: "fr",
        received: Mutex::new(Vec::new()),
    });
    let mut everyone = Audiences::new();
    everyone
        .with_member(ada.clone())
        .with_member(Arc::new(Bot))
        .with_member(jean.clone());

    let calls = std::cell::Cell::new(0);
    let report = renderer.send_contextual::<Member, _>(&everyone, "greeting", None, |member, tags| {
        calls.set(calls.get() + 1);
        tags.unparsed("name", member.name);
    });

    assert_eq!(calls.get(), 2);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(*ada.received.lock().unwrap(), vec!["Hello, Ada!"]);
    assert_eq!(*jean.received.lock().unwrap(), vec!["Bonjour, Jean !"]);
    Ok(())
}

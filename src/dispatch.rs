//! Rendering one message for many recipients.
//!
//! Each recipient gets its own render: its own locale (through
//! [`HasLocale`]) and, with [`Renderer::send_contextual`], its own tags.
//! A recipient whose render or delivery fails is logged and counted; the
//! others still get their message.

use std::any::Any;
use std::sync::Arc;

use tracing::warn;

use crate::error::DeliveryError;
use crate::locale::Locale;
use crate::markup::TextNode;
use crate::renderer::Renderer;
use crate::tag::TagRegistryBuilder;

/// Something that may know which locale it prefers.
pub trait HasLocale {
    fn locale(&self) -> Option<Locale> {
        None
    }
}

/// Type access for recipient filtering.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A message recipient, or a group forwarding to several.
pub trait Audience: HasLocale + AsAny + Send + Sync {
    fn send_message(&self, message: &TextNode) -> Result<(), DeliveryError>;

    /// The members of a forwarding group; `None` for a single recipient.
    fn members(&self) -> Option<Vec<&dyn Audience>> {
        None
    }
}

/// A forwarding group of recipients.
#[derive(Clone, Default)]
pub struct Audiences {
    members: Vec<Arc<dyn Audience>>,
}

impl Audiences {
    pub fn new() -> Self {
        Audiences::default()
    }

    pub fn with_member(&mut self, member: Arc<dyn Audience>) -> &mut Self {
        self.members.push(member);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<Arc<dyn Audience>> for Audiences {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Audience>>>(iter: I) -> Self {
        Audiences {
            members: iter.into_iter().collect(),
        }
    }
}

impl HasLocale for Audiences {}

impl Audience for Audiences {
    /// Forwards to every member; the first failure is returned after all
    /// members were tried.
    fn send_message(&self, message: &TextNode) -> Result<(), DeliveryError> {
        let mut first_error = None;
        for member in &self.members {
            if let Err(error) = member.send_message(message) {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn members(&self) -> Option<Vec<&dyn Audience>> {
        Some(self.members.iter().map(|member| &**member).collect())
    }
}

/// Outcome of a fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    /// Recipients that did not match the requested type.
    pub skipped: usize,
    /// Recipients whose render or delivery failed.
    pub failed: usize,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.delivered + self.skipped + self.failed
    }
}

/// When a forwarding group is split into its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flatten {
    /// Only without a locale override; with one the group is one recipient.
    WithoutLocale,
    Always,
}

type Select<'a> = &'a dyn Fn(&dyn Audience) -> bool;
type Configure<'a> = &'a dyn Fn(&dyn Audience, &mut TagRegistryBuilder);

impl Renderer {
    /// Send `key` without caller tags. See [`send_with`](Self::send_with).
    pub fn send(&self, audience: &dyn Audience, key: &str, locale: Option<&Locale>) -> DispatchReport {
        self.send_with(audience, key, locale, |_| {})
    }

    /// Render `key` and deliver it to `audience`.
    ///
    /// A forwarding group without a `locale` override is flattened: every
    /// member gets its own render in `member.locale()`, falling back to the
    /// default locale. With an override the group receives a single render.
    pub fn send_with<F>(
        &self,
        audience: &dyn Audience,
        key: &str,
        locale: Option<&Locale>,
        configure: F,
    ) -> DispatchReport
    where
        F: Fn(&mut TagRegistryBuilder),
    {
        let mut report = DispatchReport::default();
        self.dispatch(
            audience,
            key,
            locale,
            Flatten::WithoutLocale,
            &|_| true,
            &|_, tags| configure(tags),
            &mut report,
        );
        report
    }

    /// Deliver `key` only to recipients of type `T`, each with tags built
    /// from the recipient itself. Other recipients are skipped silently.
    ///
    /// Forwarding groups are always flattened so that their members can be
    /// matched; a `locale` override applies to every member.
    ///
    /// # Example
    ///
    /// ```ignore
    /// renderer.send_contextual::<Player, _>(&everyone, "welcome", None, |player, tags| {
    ///     tags.unparsed("name", &player.name);
    /// });
    /// ```
    pub fn send_contextual<T, F>(
        &self,
        audience: &dyn Audience,
        key: &str,
        locale: Option<&Locale>,
        configure: F,
    ) -> DispatchReport
    where
        T: Any,
        F: Fn(&T, &mut TagRegistryBuilder),
    {
        let mut report = DispatchReport::default();
        self.dispatch(
            audience,
            key,
            locale,
            Flatten::Always,
            &|recipient| recipient.as_any().is::<T>(),
            &|recipient, tags| {
                if let Some(recipient) = recipient.as_any().downcast_ref::<T>() {
                    configure(recipient, tags);
                }
            },
            &mut report,
        );
        report
    }

    fn dispatch(
        &self,
        audience: &dyn Audience,
        key: &str,
        locale: Option<&Locale>,
        flatten: Flatten,
        select: Select<'_>,
        configure: Configure<'_>,
        report: &mut DispatchReport,
    ) {
        if locale.is_none() || flatten == Flatten::Always {
            if let Some(members) = audience.members() {
                for member in members {
                    if std::ptr::addr_eq(member as *const dyn Audience, audience as *const dyn Audience) {
                        continue;
                    }
                    self.dispatch(member, key, locale, flatten, select, configure, report);
                }
                return;
            }
        }

        if !select(audience) {
            report.skipped += 1;
            return;
        }

        let target = locale.cloned().or_else(|| audience.locale());
        let message = match self.render_with(key, target.as_ref(), |tags| configure(audience, tags)) {
            Ok(message) => message,
            Err(error) => {
                warn!(key, %error, "render failed for recipient");
                report.failed += 1;
                return;
            }
        };

        match audience.send_message(&message) {
            Ok(()) => report.delivered += 1,
            Err(error) => {
                warn!(key, %error, "delivery failed for recipient");
                report.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Catalog, MapSource, TranslationStore};
    use std::cell::Cell;
    use std::sync::Mutex;

    struct Player {
        name: String,
        locale: Option<Locale>,
        inbox: Mutex<Vec<String>>,
    }

    impl Player {
        fn new(name: &str, locale: Option<&str>) -> Arc<Self> {
            Arc::new(Player {
                name: name.to_string(),
                locale: locale.map(Locale::new),
                inbox: Mutex::new(Vec::new()),
            })
        }

        fn inbox(&self) -> Vec<String> {
            self.inbox.lock().unwrap().clone()
        }
    }

    impl HasLocale for Player {
        fn locale(&self) -> Option<Locale> {
            self.locale.clone()
        }
    }

    impl Audience for Player {
        fn send_message(&self, message: &TextNode) -> Result<(), DeliveryError> {
            self.inbox.lock().unwrap().push(message.plain_text());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Console {
        lines: Mutex<Vec<String>>,
    }

    impl HasLocale for Console {}

    impl Audience for Console {
        fn send_message(&self, message: &TextNode) -> Result<(), DeliveryError> {
            self.lines.lock().unwrap().push(message.plain_text());
            Ok(())
        }
    }

    struct Disconnected;

    impl HasLocale for Disconnected {}

    impl Audience for Disconnected {
        fn send_message(&self, _: &TextNode) -> Result<(), DeliveryError> {
            Err(DeliveryError::new("connection closed"))
        }
    }

    /// A group that lists itself among its members.
    struct Loopback {
        child: Arc<Player>,
    }

    impl HasLocale for Loopback {}

    impl Audience for Loopback {
        fn send_message(&self, message: &TextNode) -> Result<(), DeliveryError> {
            self.child.send_message(message)
        }

        fn members(&self) -> Option<Vec<&dyn Audience>> {
            Some(vec![self as &dyn Audience, &*self.child as &dyn Audience])
        }
    }

    async fn renderer() -> Renderer {
        let store = TranslationStore::new(MapSource::fixed(Catalog::from_iter([
            ("en", "welcome", "Welcome, <name>!"),
            ("fr", "welcome", "Bienvenue, <name> !"),
            ("en", "restart", "Server restarting"),
        ])));
        store.reload().await.unwrap();
        Renderer::builder().store(store).build().unwrap()
    }

    #[tokio::test]
    async fn test_contextual_only_matching_recipients() {
        let renderer = renderer().await;
        let ada = Player::new("Ada", None);
        let bob = Player::new("Bob", Some("fr"));
        let console = Arc::new(Console::default());
        let everyone: Audiences = [
            ada.clone() as Arc<dyn Audience>,
            console.clone() as Arc<dyn Audience>,
            bob.clone() as Arc<dyn Audience>,
        ]
        .into_iter()
        .collect();

        let calls = Cell::new(0);
        let report = renderer.send_contextual::<Player, _>(&everyone, "welcome", None, |player, tags| {
            calls.set(calls.get() + 1);
            tags.unparsed("name", &player.name);
        });

        assert_eq!(calls.get(), 2);
        assert_eq!(
            report,
            DispatchReport {
                delivered: 2,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(ada.inbox(), vec!["Welcome, Ada!"]);
        assert_eq!(bob.inbox(), vec!["Bienvenue, Bob !"]);
        assert!(console.lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_uses_recipient_locale() {
        let renderer = renderer().await;
        let bob = Player::new("Bob", Some("fr"));
        let report = renderer.send_with(&*bob, "welcome", None, |tags| {
            tags.unparsed("name", "toi");
        });
        assert_eq!(report.delivered, 1);
        assert_eq!(bob.inbox(), vec!["Bienvenue, toi !"]);

        renderer.send(&*bob, "welcome", Some(&Locale::new("en")));
        assert_eq!(bob.inbox()[1], "Welcome, <name>!");
    }

    #[tokio::test]
    async fn test_missing_translation_delivers_key() {
        let renderer = renderer().await;
        let bob = Player::new("Bob", Some("fr"));
        renderer.send(&*bob, "restart", None);
        assert_eq!(bob.inbox(), vec!["restart"]);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let renderer = renderer().await;
        let ada = Player::new("Ada", None);
        let bob = Player::new("Bob", None);
        let group: Audiences = [
            ada.clone() as Arc<dyn Audience>,
            Arc::new(Disconnected) as Arc<dyn Audience>,
            bob.clone() as Arc<dyn Audience>,
        ]
        .into_iter()
        .collect();

        let report = renderer.send(&group, "restart", None);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total(), 3);
        assert_eq!(bob.inbox(), vec!["Server restarting"]);

        let report = renderer.send_contextual::<Player, _>(&group, "welcome", None, |_, tags| {
            tags.tag("bad name", crate::markup::Tag::text("x"));
        });
        assert_eq!(report.failed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(ada.inbox().len(), 1);
    }

    #[tokio::test]
    async fn test_locale_override_sends_group_once() {
        let renderer = renderer().await;
        let ada = Player::new("Ada", None);
        let bob = Player::new("Bob", Some("fr"));
        let mut group = Audiences::new();
        group.with_member(ada.clone()).with_member(bob.clone());

        let report = renderer.send(&group, "restart", Some(&Locale::new("en")));
        assert_eq!(report.delivered, 1);
        assert_eq!(ada.inbox(), vec!["Server restarting"]);
        assert_eq!(bob.inbox(), vec!["Server restarting"]);
    }

    #[tokio::test]
    async fn test_group_skips_itself() {
        let renderer = renderer().await;
        let child = Player::new("Ada", None);
        let group = Loopback {
            child: child.clone(),
        };
        let report = renderer.send(&group, "restart", None);
        assert_eq!(report.delivered, 1);
        assert_eq!(child.inbox(), vec!["Server restarting"]);
    }

    #[tokio::test]
    async fn test_nested_groups_are_flattened() {
        let renderer = renderer().await;
        let ada = Player::new("Ada", None);
        let bob = Player::new("Bob", Some("fr"));
        let mut inner = Audiences::new();
        inner.with_member(bob.clone());
        let mut outer = Audiences::new();
        outer.with_member(ada.clone()).with_member(Arc::new(inner));

        let report = renderer.send_contextual::<Player, _>(&outer, "welcome", None, |player, tags| {
            tags.unparsed("name", &player.name);
        });
        assert_eq!(report.delivered, 2);
        assert_eq!(bob.inbox(), vec!["Bienvenue, Bob !"]);
    }

    #[tokio::test]
    async fn test_contextual_with_locale_reaches_members() {
        let renderer = renderer().await;
        let ada = Player::new("Ada", None);
        let bob = Player::new("Bob", Some("fr"));
        let everyone: Audiences = [
            ada.clone() as Arc<dyn Audience>,
            Arc::new(Console::default()) as Arc<dyn Audience>,
            bob.clone() as Arc<dyn Audience>,
        ]
        .into_iter()
        .collect();

        let calls = Cell::new(0);
        let report = renderer.send_contextual::<Player, _>(
            &everyone,
            "welcome",
            Some(&Locale::new("en")),
            |player, tags| {
                calls.set(calls.get() + 1);
                tags.unparsed("name", &player.name);
            },
        );

        assert_eq!(calls.get(), 2);
        assert_eq!(
            report,
            DispatchReport {
                delivered: 2,
                skipped: 1,
                failed: 0
            }
        );
        assert_eq!(ada.inbox(), vec!["Welcome, Ada!"]);
        assert_eq!(bob.inbox(), vec!["Welcome, Bob!"]);
    }
}

//! One open document: text, entity mappings, revisions and style passes.
//!
//! The host owns the display storage and the clock. It reports text
//! changes and cursor moves, and calls [`EditorSession::poll`] from its
//! refresh loop; the session decides when to reparse and restyle.

use web_time::Instant;

use crate::attributes::StyledText;
use crate::config::RenderSettings;
use crate::delta::{TextDelta, text_delta};
use crate::entity::{EntityTracker, decode_entities};
use crate::error::WorkerError;
use crate::images::{CachedImageRenderer, ImageCache, ImageContext};
use crate::parse::parse_document;
use crate::pass::{PassEnv, run_full_pass, run_incremental_pass};
use crate::render::ImageRenderer;
use crate::render_cache::StylePassCache;
use crate::revision::{Debouncer, ParseOutcome, ParseRequest, ParseWorker, RevisionCounter};
use crate::visibility::VisibilityStats;

#[derive(Debug)]
pub struct EditorSession {
    text: String,
    entities: EntityTracker,
    settings: RenderSettings,
    counter: RevisionCounter,
    debouncer: Debouncer,
    cursor: usize,
    parsed: Option<ParseOutcome>,
    cache: Option<StylePassCache>,
    worker: Option<ParseWorker>,
    /// Revision last handed to the worker.
    requested: Option<u64>,
}

impl EditorSession {
    /// Open a document from its on-disk text.
    pub fn open(raw: &str, settings: RenderSettings) -> Self {
        let decoded = decode_entities(raw);
        Self {
            text: decoded.decoded,
            entities: EntityTracker::new(decoded.mappings),
            debouncer: Debouncer::new(settings.debounce()),
            settings,
            counter: RevisionCounter::new(),
            cursor: 0,
            parsed: None,
            cache: None,
            worker: None,
            requested: None,
        }
    }

    /// Parse on a background thread from now on.
    pub fn spawn_worker(&mut self) -> Result<(), WorkerError> {
        self.worker = Some(ParseWorker::spawn(self.counter.clone())?);
        Ok(())
    }

    /// Image renderer for this document over the shared cache, using the
    /// session's image settings.
    pub fn image_renderer(&self, context: ImageContext) -> CachedImageRenderer<'static> {
        CachedImageRenderer::from_settings(context, &self.settings, ImageCache::shared())
    }

    /// The decoded text, as displayed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn revision(&self) -> u64 {
        self.counter.current()
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn entities(&self) -> &EntityTracker {
        &self.entities
    }

    pub fn style_cache(&self) -> Option<&StylePassCache> {
        self.cache.as_ref()
    }

    /// Record new text from the editing surface.
    ///
    /// Returns the bounding edit, or `None` if nothing changed.
    pub fn replace_text(&mut self, new_text: impl Into<String>, now: Instant) -> Option<TextDelta> {
        let new_text = new_text.into();
        let delta = text_delta(&self.text, &new_text)?;
        self.entities.apply_delta(&delta);
        self.text = new_text;
        let revision = self.counter.bump();
        self.debouncer.note_edit(now);
        tracing::trace!(
            target: "livemark::parse",
            revision,
            old = ?delta.old_range,
            new = ?delta.new_range,
            "text changed"
        );
        Some(delta)
    }

    /// Drive reparsing and restyling. Returns `true` if a full pass ran.
    pub fn poll<S, R>(&mut self, now: Instant, storage: &mut S, env: &PassEnv<'_, R>) -> bool
    where
        S: StyledText,
        R: ImageRenderer,
    {
        let mut restyled = false;

        let finished = match &self.worker {
            Some(worker) => drain(worker),
            None => Vec::new(),
        };
        for outcome in finished {
            restyled |= self.accept_parse(outcome, storage, env);
        }

        let revision = self.counter.current();
        let never_parsed = self.parsed.is_none() && self.requested != Some(revision);
        if self.debouncer.take_due(now) || never_parsed {
            let sent = self.worker.as_ref().map(|worker| {
                worker.request(ParseRequest {
                    generation: revision,
                    text: self.text.clone(),
                    options: self.settings.parse,
                })
            });
            match sent {
                Some(Ok(())) => self.requested = Some(revision),
                Some(Err(err)) => {
                    tracing::debug!(target: "livemark::parse", %err, "parsing in the foreground");
                    self.worker = None;
                    restyled |= self.reparse_now(storage, env);
                }
                None => restyled |= self.reparse_now(storage, env),
            }
        } else if self.needs_restyle(env) {
            restyled |= self.restyle(storage, env);
        }

        restyled
    }

    /// Commit a background parse if it is still current.
    pub fn accept_parse<S, R>(
        &mut self,
        outcome: ParseOutcome,
        storage: &mut S,
        env: &PassEnv<'_, R>,
    ) -> bool
    where
        S: StyledText,
        R: ImageRenderer,
    {
        if !self.counter.is_current(outcome.generation) {
            tracing::trace!(
                target: "livemark::parse",
                generation = outcome.generation,
                current = self.counter.current(),
                "discarding stale parse"
            );
            return false;
        }
        self.parsed = Some(outcome);
        self.restyle(storage, env)
    }

    /// Parse the current text synchronously and restyle.
    pub fn reparse_now<S, R>(&mut self, storage: &mut S, env: &PassEnv<'_, R>) -> bool
    where
        S: StyledText,
        R: ImageRenderer,
    {
        self.debouncer.cancel();
        let generation = self.counter.current();
        self.parsed = Some(ParseOutcome {
            generation,
            document: parse_document(self.text.clone(), self.settings.parse),
        });
        self.restyle(storage, env)
    }

    /// Full pass from the last parse, without reparsing. Does nothing if
    /// that parse is stale.
    pub fn restyle<S, R>(&mut self, storage: &mut S, env: &PassEnv<'_, R>) -> bool
    where
        S: StyledText,
        R: ImageRenderer,
    {
        let Some(parsed) = self
            .parsed
            .as_ref()
            .filter(|parsed| self.counter.is_current(parsed.generation))
        else {
            return false;
        };
        self.cache = Some(run_full_pass(
            &parsed.document,
            parsed.generation,
            storage,
            self.cursor,
            env,
        ));
        true
    }

    /// Move the cursor, restyling incrementally when the cache allows.
    ///
    /// Returns `None` when the cache is missing or stale; the next full
    /// pass picks the new cursor up.
    pub fn move_cursor<S, R>(
        &mut self,
        cursor: usize,
        storage: &mut S,
        env: &PassEnv<'_, R>,
    ) -> Option<VisibilityStats>
    where
        S: StyledText,
        R: ImageRenderer,
    {
        let old = std::mem::replace(&mut self.cursor, cursor);
        let cache = self.cache.as_ref().filter(|cache| {
            cache.is_valid_for(env.preferences, env.theme_revision, self.counter.current())
        })?;
        Some(run_incremental_pass(storage, cache, old, cursor, env))
    }

    /// Theme or preferences changed: the next poll runs a full pass.
    pub fn invalidate_styles(&mut self) {
        self.cache = None;
    }

    fn needs_restyle<R>(&self, env: &PassEnv<'_, R>) -> bool {
        let current = self.counter.current();
        let parsed_current = self
            .parsed
            .as_ref()
            .is_some_and(|parsed| parsed.generation == current);
        let cache_valid = self.cache.as_ref().is_some_and(|cache| {
            cache.is_valid_for(env.preferences, env.theme_revision, current)
        });
        parsed_current && !cache_valid
    }

    /// Text to write back to disk, entities restored.
    pub fn save(&self) -> String {
        self.entities.encode(&self.text)
    }
}

fn drain(worker: &ParseWorker) -> Vec<ParseOutcome> {
    let mut finished = Vec::new();
    loop {
        match worker.try_recv() {
            Ok(Some(outcome)) => finished.push(outcome),
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(target: "livemark::parse", %err, "parse worker gone");
                break;
            }
        }
    }
    finished
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributedString;
    use crate::config::EditorPreferences;
    use crate::style::HIDDEN_FONT_SIZE;
    use crate::theme::Theme;
    use std::time::Duration;

    fn settings() -> RenderSettings {
        RenderSettings {
            debounce_ms: 100,
            ..Default::default()
        }
    }

    #[test]
    fn first_poll_parses_and_styles() {
        let theme = Theme::default();
        let prefs = EditorPreferences::default();
        let env = PassEnv::new(&theme, &prefs, ());
        let mut session = EditorSession::open("a **b** c", settings());
        let mut storage = AttributedString::new(session.text());

        assert!(session.poll(Instant::now(), &mut storage, &env));
        assert_eq!(storage.attributes_at(2).and_then(|a| a.font_size), Some(HIDDEN_FONT_SIZE));
        // Nothing more to do.
        assert!(!session.poll(Instant::now(), &mut storage, &env));
    }

    #[test]
    fn edits_wait_for_the_debounce_window() {
        let theme = Theme::default();
        let prefs = EditorPreferences::default();
        let env = PassEnv::new(&theme, &prefs, ());
        let start = Instant::now();
        let mut session = EditorSession::open("plain", settings());
        let mut storage = AttributedString::new(session.text());
        session.poll(start, &mut storage, &env);

        let delta = session.replace_text("plain *x*", start).unwrap();
        assert_eq!(delta.old_range, 5..5);
        storage.replace_range(5..5, " *x*");
        assert_eq!(session.revision(), 1);

        // Stale cache: cursor moves only record the position.
        assert!(session.move_cursor(9, &mut storage, &env).is_none());
        assert!(!session.poll(start + Duration::from_millis(50), &mut storage, &env));
        assert!(session.poll(start + Duration::from_millis(100), &mut storage, &env));
        assert_eq!(session.style_cache().map(|c| c.generation), Some(1));
        assert!(session.move_cursor(0, &mut storage, &env).is_some());
    }

    #[test]
    fn stale_background_results_are_discarded() {
        let theme = Theme::default();
        let prefs = EditorPreferences::default();
        let env = PassEnv::new(&theme, &prefs, ());
        let mut session = EditorSession::open("one", settings());
        let mut storage = AttributedString::new("one");

        let stale = ParseOutcome {
            generation: session.revision(),
            document: parse_document("one".to_string(), Default::default()),
        };
        session.replace_text("one two", Instant::now());
        assert!(!session.accept_parse(stale, &mut storage, &env));
        assert!(session.style_cache().is_none());
    }

    #[test]
    fn theme_change_forces_full_pass() {
        let theme = Theme::default();
        let prefs = EditorPreferences::default();
        let env = PassEnv::new(&theme, &prefs, ());
        let mut session = EditorSession::open("**b**", settings());
        let mut storage = AttributedString::new(session.text());
        let now = Instant::now();
        session.poll(now, &mut storage, &env);

        let newer = env.with_theme_revision(1);
        assert!(session.move_cursor(2, &mut storage, &newer).is_none());
        assert!(session.poll(now, &mut storage, &newer));
        assert_eq!(session.style_cache().map(|c| c.theme_revision), Some(1));

        session.invalidate_styles();
        assert!(session.poll(now, &mut storage, &newer));
    }

    #[test]
    fn image_renderer_follows_settings() {
        let session = EditorSession::open(
            "![a](pic.png)",
            RenderSettings {
                max_image_width: 200,
                remote_images: true,
                ..settings()
            },
        );
        let renderer = session.image_renderer(ImageContext::new("/site/post.md"));
        assert_eq!(renderer.max_width, 200);
        assert!(renderer.context.remote_enabled);
        assert_eq!(ImageCache::shared().limits(), session.settings().image_cache);
    }

    #[test]
    fn save_restores_entities() {
        let mut session = EditorSession::open("Fish &amp; Chips", settings());
        assert_eq!(session.text(), "Fish & Chips");
        session.replace_text("Fish & Chips!", Instant::now());
        assert_eq!(session.save(), "Fish &amp; Chips!");
        session.replace_text("Fish + Chips!", Instant::now());
        assert_eq!(session.save(), "Fish + Chips!");
    }

    #[test]
    fn worker_results_are_committed_on_poll() {
        let theme = Theme::default();
        let prefs = EditorPreferences::default();
        let env = PassEnv::new(&theme, &prefs, ());
        let mut session = EditorSession::open("# Title", settings());
        session.spawn_worker().unwrap();
        let mut storage = AttributedString::new(session.text());

        let start = Instant::now();
        // Sends the request; the result arrives later.
        session.poll(start, &mut storage, &env);
        let mut restyled = false;
        for _ in 0..500 {
            if session.poll(start, &mut storage, &env) {
                restyled = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(restyled);
        assert_eq!(session.style_cache().map(|c| c.generation), Some(0));
    }
}

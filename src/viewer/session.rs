//! Viewer state machine for one mounted collection.
//!
//! The session owns the current index, the screensaver timers and the
//! outstanding preload hint. Hosts feed it [`ViewerEvent`]s and clock ticks
//! and apply the returned [`ViewerEffect`]s (update the URL, swap the
//! `<link rel="preload">`, leave the page).

use super::position::{IndexPolicy, initial_index, position_value, resolve_index};
use super::screensaver::{Screensaver, ScreensaverConfig, ScreensaverTick};
use crate::sources::{NavigationDirection, PreloadDescriptor, preload_for};
use crate::types::{CollectionEntry, ImageEntry};
use rand::Rng;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerMode {
    Browsing,
    Screensaver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowRight,
    ArrowLeft,
    Escape,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerEvent {
    PointerMove,
    Click,
    Touch,
    Key(Key),
    Next,
    Previous,
    /// Direct pick, e.g. from a thumbnail strip.
    Select(usize),
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEffect {
    /// The shown image changed. `position` is the new `p` value, or `None`
    /// to drop the parameter.
    IndexChanged {
        index: usize,
        position: Option<String>,
    },
    Preload(PreloadDescriptor),
    ReleasePreload,
    ModeChanged { from: ViewerMode, to: ViewerMode },
    Exited,
}

pub struct GallerySession<R> {
    collection: CollectionEntry,
    index: usize,
    sizes: String,
    screensaver: Screensaver,
    preload: Option<PreloadDescriptor>,
    rng: R,
    closed: bool,
}

impl<R: Rng> GallerySession<R> {
    /// Open `collection` at the position given by the `p` parameter.
    ///
    /// Returns the session and the effects of mounting (the initial preload).
    pub fn mount(
        collection: CollectionEntry,
        position: Option<&str>,
        config: ScreensaverConfig,
        sizes: impl Into<String>,
        rng: R,
        now: Instant,
    ) -> (Self, Vec<ViewerEffect>) {
        let total = collection.images.len();
        let mut session = Self {
            index: initial_index(position, total),
            screensaver: Screensaver::new(config, total, now),
            collection,
            sizes: sizes.into(),
            preload: None,
            rng,
            closed: false,
        };
        let mut effects = Vec::new();
        session.refresh_preload(&mut effects);
        (session, effects)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn collection(&self) -> &CollectionEntry {
        &self.collection
    }

    pub fn current_image(&self) -> Option<&ImageEntry> {
        self.collection.images.get(self.index)
    }

    pub fn mode(&self) -> ViewerMode {
        if self.screensaver.is_active() {
            ViewerMode::Screensaver
        } else {
            ViewerMode::Browsing
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn preload(&self) -> Option<&PreloadDescriptor> {
        self.preload.as_ref()
    }

    /// When the host should call [`on_tick`](Self::on_tick) next.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.screensaver.next_deadline()
    }

    pub fn on_event(&mut self, event: ViewerEvent, now: Instant) -> Vec<ViewerEffect> {
        let mut effects = Vec::new();
        if self.closed {
            return effects;
        }
        match event {
            ViewerEvent::PointerMove
            | ViewerEvent::Click
            | ViewerEvent::Touch
            | ViewerEvent::Key(Key::Other) => self.register_interaction(now, &mut effects),
            ViewerEvent::Next | ViewerEvent::Key(Key::ArrowRight) => {
                self.goto(self.index as i64 + 1, IndexPolicy::Wrap, &mut effects);
                self.register_interaction(now, &mut effects);
            }
            ViewerEvent::Previous | ViewerEvent::Key(Key::ArrowLeft) => {
                self.goto(self.index as i64 - 1, IndexPolicy::Wrap, &mut effects);
                self.register_interaction(now, &mut effects);
            }
            ViewerEvent::Select(index) => {
                let index = i64::try_from(index).unwrap_or(i64::MAX);
                self.goto(index, IndexPolicy::Clamp, &mut effects);
                self.register_interaction(now, &mut effects);
            }
            ViewerEvent::Exit | ViewerEvent::Key(Key::Escape) => {
                self.register_interaction(now, &mut effects);
                self.close(&mut effects);
            }
        }
        effects
    }

    pub fn on_tick(&mut self, now: Instant) -> Vec<ViewerEffect> {
        let mut effects = Vec::new();
        if self.closed {
            return effects;
        }
        match self.screensaver.poll(now, self.index, &mut self.rng) {
            Some(ScreensaverTick::Activated) => {
                self.mode_changed(ViewerMode::Browsing, ViewerMode::Screensaver, &mut effects);
            }
            Some(ScreensaverTick::Advance(next)) => {
                self.goto(next as i64, IndexPolicy::Wrap, &mut effects);
            }
            None => {}
        }
        effects
    }

    /// Tear down without an explicit exit: timers stop and the preload is
    /// released.
    pub fn unmount(&mut self) -> Vec<ViewerEffect> {
        let mut effects = Vec::new();
        if !self.closed {
            self.screensaver.stop();
            self.release_preload(&mut effects);
            self.closed = true;
        }
        effects
    }

    fn goto(&mut self, index: i64, policy: IndexPolicy, effects: &mut Vec<ViewerEffect>) {
        let next = resolve_index(index, self.collection.images.len(), policy);
        if next == self.index {
            return;
        }
        self.index = next;
        effects.push(ViewerEffect::IndexChanged {
            index: next,
            position: position_value(next),
        });
        self.refresh_preload(effects);
    }

    fn register_interaction(&mut self, now: Instant, effects: &mut Vec<ViewerEffect>) {
        let was_active = self.screensaver.is_active();
        self.screensaver.reset(now);
        if was_active {
            self.mode_changed(ViewerMode::Screensaver, ViewerMode::Browsing, effects);
        }
    }

    fn mode_changed(&self, from: ViewerMode, to: ViewerMode, effects: &mut Vec<ViewerEffect>) {
        debug!(
            collection = %self.collection.slug,
            index = self.index,
            ?from,
            ?to,
            "viewer mode changed"
        );
        effects.push(ViewerEffect::ModeChanged { from, to });
    }

    fn refresh_preload(&mut self, effects: &mut Vec<ViewerEffect>) {
        self.release_preload(effects);
        let next = preload_for(
            &self.collection,
            self.index,
            NavigationDirection::Forward,
            &self.sizes,
            true,
        );
        if let Some(descriptor) = next {
            effects.push(ViewerEffect::Preload(descriptor.clone()));
            self.preload = Some(descriptor);
        }
    }

    fn release_preload(&mut self, effects: &mut Vec<ViewerEffect>) {
        if self.preload.take().is_some() {
            effects.push(ViewerEffect::ReleasePreload);
        }
    }

    fn close(&mut self, effects: &mut Vec<ViewerEffect>) {
        self.screensaver.stop();
        self.release_preload(effects);
        self.closed = true;
        effects.push(ViewerEffect::Exited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::Duration;

    const S: Duration = Duration::from_secs(1);

    fn mount(count: usize, position: Option<&str>) -> (GallerySession<StdRng>, Vec<ViewerEffect>, Instant) {
        let manifest = sample_manifest(&[("linee", count)]);
        let collection = manifest.collections["linee"].clone();
        let now = Instant::now();
        let (session, effects) = GallerySession::mount(
            collection,
            position,
            ScreensaverConfig::default(),
            "100vw",
            StdRng::seed_from_u64(11),
            now,
        );
        (session, effects, now)
    }

    fn changed_indices(effects: &[ViewerEffect]) -> Vec<usize> {
        effects
            .iter()
            .filter_map(|e| match e {
                ViewerEffect::IndexChanged { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    // =========================================================================
    // Mounting
    // =========================================================================

    #[test]
    fn deep_link_past_end_opens_last_image() {
        let (session, _, _) = mount(4, Some("999"));
        assert_eq!(session.index(), 3);
        assert_eq!(session.current_image().unwrap().slug, "img-4");
    }

    #[test]
    fn mount_preloads_next_image() {
        let (session, effects, _) = mount(3, Some("3"));
        assert_eq!(session.index(), 2);
        match &effects[..] {
            [ViewerEffect::Preload(p)] => assert_eq!(p.href, "/i/linee/w-960/img-1.jpg"),
            other => panic!("unexpected effects {other:?}"),
        }
    }

    #[test]
    fn single_image_has_no_preload_or_screensaver() {
        let (mut session, effects, t0) = mount(1, None);
        assert!(effects.is_empty());
        assert_eq!(session.next_deadline(), None);
        assert!(session.on_tick(t0 + 100 * S).is_empty());
        assert_eq!(session.mode(), ViewerMode::Browsing);
    }

    #[test]
    fn empty_collection_is_inert() {
        let (mut session, effects, t0) = mount(0, Some("5"));
        assert!(effects.is_empty());
        assert_eq!(session.index(), 0);
        assert!(session.current_image().is_none());
        assert!(session.on_event(ViewerEvent::Next, t0).is_empty());
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    #[test]
    fn next_and_previous_wrap() {
        let (mut session, _, t0) = mount(3, Some("3"));
        let effects = session.on_event(ViewerEvent::Next, t0);
        assert_eq!(changed_indices(&effects), vec![0]);
        assert_eq!(
            effects[0],
            ViewerEffect::IndexChanged {
                index: 0,
                position: None
            }
        );

        let effects = session.on_event(ViewerEvent::Key(Key::ArrowLeft), t0);
        assert_eq!(changed_indices(&effects), vec![2]);
        assert_eq!(
            effects[0],
            ViewerEffect::IndexChanged {
                index: 2,
                position: Some("3".into())
            }
        );
    }

    #[test]
    fn index_change_swaps_preload() {
        let (mut session, _, t0) = mount(3, None);
        let effects = session.on_event(ViewerEvent::Key(Key::ArrowRight), t0);
        assert_eq!(effects[1], ViewerEffect::ReleasePreload);
        match &effects[2] {
            ViewerEffect::Preload(p) => assert_eq!(p.href, "/i/linee/w-960/img-3.jpg"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(session.preload().unwrap().href, "/i/linee/w-960/img-3.jpg");
    }

    #[test]
    fn select_clamps() {
        let (mut session, _, t0) = mount(4, None);
        let effects = session.on_event(ViewerEvent::Select(42), t0);
        assert_eq!(changed_indices(&effects), vec![3]);
    }

    #[test]
    fn selecting_current_image_changes_nothing() {
        let (mut session, _, t0) = mount(4, Some("2"));
        assert!(session.on_event(ViewerEvent::Select(1), t0).is_empty());
    }

    #[test]
    fn escape_exits_and_later_events_are_ignored() {
        let (mut session, _, t0) = mount(3, None);
        let effects = session.on_event(ViewerEvent::Key(Key::Escape), t0);
        assert_eq!(
            effects,
            vec![ViewerEffect::ReleasePreload, ViewerEffect::Exited]
        );
        assert!(session.is_closed());
        assert_eq!(session.next_deadline(), None);
        assert!(session.on_event(ViewerEvent::Next, t0).is_empty());
        assert!(session.on_tick(t0 + 100 * S).is_empty());
    }

    #[test]
    fn unmount_releases_preload_once() {
        let (mut session, _, _) = mount(3, None);
        assert_eq!(session.unmount(), vec![ViewerEffect::ReleasePreload]);
        assert!(session.unmount().is_empty());
    }

    // =========================================================================
    // Screensaver
    // =========================================================================

    #[test]
    fn idle_enters_screensaver_and_interaction_leaves_it() {
        let (mut session, _, t0) = mount(3, None);
        assert!(session.on_tick(t0 + 24 * S).is_empty());

        let effects = session.on_tick(t0 + 25 * S);
        assert_eq!(
            effects,
            vec![ViewerEffect::ModeChanged {
                from: ViewerMode::Browsing,
                to: ViewerMode::Screensaver
            }]
        );
        assert_eq!(session.mode(), ViewerMode::Screensaver);

        let effects = session.on_event(ViewerEvent::PointerMove, t0 + 26 * S);
        assert_eq!(
            effects,
            vec![ViewerEffect::ModeChanged {
                from: ViewerMode::Screensaver,
                to: ViewerMode::Browsing
            }]
        );
        assert_eq!(session.mode(), ViewerMode::Browsing);
        assert_eq!(session.next_deadline(), Some(t0 + 51 * S));

        // the advance scheduled before the interaction never fires
        let index = session.index();
        assert!(session.on_tick(t0 + 31 * S).is_empty());
        assert!(session.on_tick(t0 + 50 * S).is_empty());
        assert_eq!(session.index(), index);
        assert_eq!(session.mode(), ViewerMode::Browsing);
    }

    #[test]
    fn screensaver_advances_to_other_images() {
        let (mut session, _, t0) = mount(5, None);
        session.on_tick(t0 + 25 * S);
        let mut at = t0 + 25 * S;
        for _ in 0..10 {
            let before = session.index();
            at += 6 * S;
            let effects = session.on_tick(at);
            assert_eq!(session.mode(), ViewerMode::Screensaver);
            let changed = changed_indices(&effects);
            assert_eq!(changed.len(), 1);
            assert_ne!(changed[0], before);
        }
    }

    #[test]
    fn interactions_postpone_screensaver() {
        let (mut session, _, t0) = mount(3, None);
        session.on_event(ViewerEvent::Touch, t0 + 20 * S);
        assert!(session.on_tick(t0 + 25 * S).is_empty());
        assert_eq!(session.next_deadline(), Some(t0 + 45 * S));
        session.on_event(ViewerEvent::Key(Key::Other), t0 + 40 * S);
        assert_eq!(session.next_deadline(), Some(t0 + 65 * S));
    }

    #[test]
    fn navigation_out_of_screensaver_reports_mode_change() {
        let (mut session, _, t0) = mount(3, None);
        session.on_tick(t0 + 25 * S);
        let effects = session.on_event(ViewerEvent::Next, t0 + 27 * S);
        assert_eq!(changed_indices(&effects), vec![1]);
        assert!(effects.contains(&ViewerEffect::ModeChanged {
            from: ViewerMode::Screensaver,
            to: ViewerMode::Browsing
        }));
    }
}

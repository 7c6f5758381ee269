//! Category-map interpreter.
//!
//! Resolves pointer and keyboard activity against a published page: map
//! lookup, behavior dispatch, debounce, the drag state machine and scroll
//! throttling. The page is immutable after publication, so the interpreter
//! holds no locks; all mutable state (debounce stamps, drag phase, scroll
//! positions) is its own.

use crate::behavior::{Behavior, NavigateKind, ValidationFlags};
use crate::model::{CategoryDef, Page};
use crate::url::PixnetUrl;
use bitflags::bitflags;
use bytes::Bytes;
use pixnet_wire::{DragAction, Message, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

bitflags! {
    /// Modifier key mask carried in `PIXEVT`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        /// Shift held
        const SHIFT = 1 << 0;
        /// Control held
        const CTRL = 1 << 1;
        /// Alt held
        const ALT = 1 << 2;
        /// Meta / super held
        const META = 1 << 3;
    }
}

/// Pointer and keyboard action kinds fed to the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    /// Button pressed
    Down,
    /// Button released
    Up,
    /// Pointer moved
    Move,
    /// Press and release in place
    Click,
    /// Two clicks within the double-click window
    DoubleClick,
    /// Key pressed while the pointer rests on the pixel
    KeyPress,
}

/// Faults handled locally; nothing goes out on the wire for these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalFault {
    /// Category present in the map but missing from the definitions
    InvalidZone(u16),
    /// Behavior payload failed to decode
    MalformedBehavior(u16),
    /// Navigate target failed URL validation
    BadUrl(String),
}

/// Media transport commands forwarded to the audio collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCommand {
    /// Toggle between playing and paused
    PlayPause,
    /// Seek to a position in milliseconds
    Seek(u32),
}

/// What an interpreted event amounts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing to do
    Discarded,
    /// Send this message to the server
    Send(Message),
    /// The renderer should navigate
    Navigate {
        /// Path or absolute `pixnet://` URL
        target: String,
        /// Destination surface
        kind: NavigateKind,
    },
    /// Client-side visual effect, no outbound event
    Effect {
        /// Category the effect belongs to
        category: u16,
        /// Renderer-defined effect discriminant
        effect: u8,
    },
    /// The renderer should open an input surface
    OpenInput {
        /// Zone ID keying the surface
        zone_id: u16,
        /// Validation rules to apply on submit
        flags: ValidationFlags,
        /// Maximum accepted length (0 = unlimited)
        max_length: u16,
    },
    /// Forward to the audio collaborator; no wire message in v1
    Media {
        /// Stream the command targets
        stream_id: u8,
        /// The command
        command: MediaCommand,
    },
    /// Local fault, event dropped
    Fault(LocalFault),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragPhase {
    Idle,
    Dragging { src: u16 },
}

#[derive(Debug, Default, Clone, Copy)]
struct ScrollState {
    pos_x: u16,
    pos_y: u16,
    last_emit: Option<Instant>,
}

/// Current wall-clock timestamp in microseconds.
fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// The category-map interpreter for one session's current page.
pub struct Interpreter {
    page: Arc<Page>,
    session_id: SessionId,
    out_seq: u32,
    debounce: HashMap<(u16, String), Instant>,
    drag: DragPhase,
    drag_payload: Bytes,
    scroll: HashMap<u16, ScrollState>,
    frame_interval: Duration,
}

impl Interpreter {
    /// Build an interpreter over a published page.
    pub fn new(page: Arc<Page>, session_id: SessionId) -> Self {
        Self {
            page,
            session_id,
            out_seq: 0,
            debounce: HashMap::new(),
            drag: DragPhase::Idle,
            drag_payload: Bytes::new(),
            scroll: HashMap::new(),
            frame_interval: Duration::from_millis(16),
        }
    }

    /// Override the scroll emission interval (one `PIXSCR` per interval).
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Replace the page; zone-keyed state does not carry across pages.
    pub fn set_page(&mut self, page: Arc<Page>) {
        self.page = page;
        self.debounce.clear();
        self.drag = DragPhase::Idle;
        self.drag_payload = Bytes::new();
        self.scroll.clear();
    }

    /// The page currently interpreted.
    pub fn page(&self) -> &Arc<Page> {
        &self.page
    }

    fn next_seq(&mut self) -> u32 {
        let seq = self.out_seq;
        self.out_seq += 1;
        seq
    }

    /// Pick the winning category among candidates: highest priority wins,
    /// ties break to the smaller numeric ID.
    ///
    /// This is the rule slopped pointer dispatch uses to arbitrate between
    /// categories inside the hit rectangle; overlay consumers can apply it
    /// to any candidate set of their own.
    pub fn resolve<'a, I>(&self, candidates: I) -> Option<&'a CategoryDef>
    where
        I: IntoIterator<Item = &'a CategoryDef>,
    {
        candidates
            .into_iter()
            .min_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)))
    }

    /// All distinct categories whose pixels overlap the given rectangle,
    /// for implementations that want to draw overlays.
    pub fn categories_in_region(&self, x0: u16, y0: u16, x1: u16, y1: u16) -> Vec<&CategoryDef> {
        let mut seen = Vec::new();
        for y in y0..=y1.min(self.page.height.saturating_sub(1)) {
            for x in x0..=x1.min(self.page.width.saturating_sub(1)) {
                if let Some(def) = self.page.category_at(x, y) {
                    if !seen.iter().any(|d: &&CategoryDef| d.id == def.id) {
                        seen.push(def);
                    }
                }
            }
        }
        seen
    }

    /// Interpret a pointer or keyboard action at pixel `(x, y)`.
    pub fn pointer_event(
        &mut self,
        x: u16,
        y: u16,
        action: PointerAction,
        modifiers: Modifiers,
    ) -> Outcome {
        self.pointer_event_with_slop(x, y, 0, action, modifiers)
    }

    /// Interpret a pointer action with a hit tolerance, for touch-style
    /// input.
    ///
    /// Every category whose pixels fall within `slop` of `(x, y)` is a
    /// candidate; the highest-priority one wins, ties breaking to the
    /// smaller ID. A slop of zero dispatches on the pixel's own category
    /// alone.
    pub fn pointer_event_with_slop(
        &mut self,
        x: u16,
        y: u16,
        slop: u16,
        action: PointerAction,
        modifiers: Modifiers,
    ) -> Outcome {
        // An in-flight drag consumes moves and releases wherever they land.
        if let DragPhase::Dragging { src } = self.drag {
            match action {
                PointerAction::Move => {
                    return self.drag_message(DragAction::Move, src, 0, x, y);
                }
                PointerAction::Up => {
                    return self.finish_drag(src, x, y);
                }
                _ => {}
            }
        }

        let def = if slop == 0 {
            let cid = match self.page.category_id_at(x, y) {
                Some(0) | None => return Outcome::Discarded,
                Some(cid) => cid,
            };
            match self.page.categories.get(&cid) {
                Some(def) => def.clone(),
                None => {
                    warn!("pointer event hit undefined category {}", cid);
                    return Outcome::Fault(LocalFault::InvalidZone(cid));
                }
            }
        } else {
            let x0 = x.saturating_sub(slop);
            let y0 = y.saturating_sub(slop);
            let x1 = x.saturating_add(slop);
            let y1 = y.saturating_add(slop);
            match self.resolve(self.categories_in_region(x0, y0, x1, y1)) {
                Some(def) => def.clone(),
                None => return Outcome::Discarded,
            }
        };
        let cid = def.id;

        let behavior = match def.behavior() {
            Ok(b) => b,
            Err(e) => {
                warn!("category {} has malformed behavior data: {}", cid, e);
                return Outcome::Fault(LocalFault::MalformedBehavior(cid));
            }
        };

        match behavior {
            Behavior::Static => Outcome::Discarded,
            Behavior::Navigate { target, kind } => match action {
                PointerAction::Click | PointerAction::DoubleClick => {
                    self.navigate_outcome(target, kind)
                }
                _ => Outcome::Discarded,
            },
            Behavior::EmitEvent {
                name,
                event_type,
                debounce_ms,
            } => match action {
                PointerAction::Click | PointerAction::DoubleClick | PointerAction::KeyPress => {
                    self.emit_event(cid, name, event_type, debounce_ms, x, y, modifiers)
                }
                _ => Outcome::Discarded,
            },
            Behavior::InputZone {
                zone_id,
                flags,
                max_length,
            } => match action {
                PointerAction::Click | PointerAction::KeyPress => Outcome::OpenInput {
                    zone_id,
                    flags,
                    max_length,
                },
                _ => Outcome::Discarded,
            },
            Behavior::HoverEffect { effect } => match action {
                PointerAction::Move => Outcome::Effect {
                    category: cid,
                    effect,
                },
                _ => Outcome::Discarded,
            },
            Behavior::ClickEffect { effect } => match action {
                PointerAction::Click | PointerAction::Down => Outcome::Effect {
                    category: cid,
                    effect,
                },
                _ => Outcome::Discarded,
            },
            Behavior::DragZone { payload } => match action {
                PointerAction::Down => {
                    self.drag = DragPhase::Dragging { src: cid };
                    self.drag_payload = payload;
                    self.drag_message(DragAction::Start, cid, 0, x, y)
                }
                _ => Outcome::Discarded,
            },
            Behavior::DropZone { .. } => Outcome::Discarded,
            Behavior::ScrollZone { step, .. } => match action {
                PointerAction::KeyPress => {
                    let delta = step as i32;
                    self.scroll_by(x, y, 0, delta)
                }
                _ => Outcome::Discarded,
            },
            Behavior::MediaZone {
                stream_id,
                controls,
            } => match action {
                PointerAction::Click if controls & 0x01 != 0 => Outcome::Media {
                    stream_id,
                    command: MediaCommand::PlayPause,
                },
                _ => Outcome::Discarded,
            },
        }
    }

    /// Apply a scroll delta at pixel `(x, y)`.
    ///
    /// The position is clamped to the zone's content size. A `PIXSCR` goes
    /// out at most once per frame interval; throttled updates still move
    /// the local position.
    pub fn scroll_by(&mut self, x: u16, y: u16, delta_x: i32, delta_y: i32) -> Outcome {
        let def = match self.page.category_at(x, y) {
            Some(def) => def.clone(),
            None => return Outcome::Discarded,
        };
        let (content_width, content_height) = match def.behavior() {
            Ok(Behavior::ScrollZone {
                content_width,
                content_height,
                ..
            }) => (content_width, content_height),
            Ok(_) => return Outcome::Discarded,
            Err(_) => return Outcome::Fault(LocalFault::MalformedBehavior(def.id)),
        };

        let state = self.scroll.entry(def.id).or_default();
        state.pos_x =
            (state.pos_x as i32 + delta_x).clamp(0, content_width as i32) as u16;
        state.pos_y =
            (state.pos_y as i32 + delta_y).clamp(0, content_height as i32) as u16;

        let now = Instant::now();
        if let Some(last) = state.last_emit {
            if now.duration_since(last) < self.frame_interval {
                return Outcome::Discarded;
            }
        }
        state.last_emit = Some(now);
        let (scroll_x, scroll_y) = (state.pos_x, state.pos_y);

        Outcome::Send(Message::Scroll {
            session_id: self.session_id,
            zone_id: def.id,
            scroll_x,
            scroll_y,
        })
    }

    /// Validate and submit an input-zone value.
    ///
    /// A failed validation still produces a `PIXINP`, with
    /// `validation_status = 1`, so the server can react; the session stays
    /// healthy either way.
    pub fn submit_input(&mut self, category: u16, value: &str) -> Outcome {
        let def = match self.page.categories.get(&category) {
            Some(def) => def.clone(),
            None => return Outcome::Fault(LocalFault::InvalidZone(category)),
        };
        let (zone_id, flags, max_length) = match def.behavior() {
            Ok(Behavior::InputZone {
                zone_id,
                flags,
                max_length,
            }) => (zone_id, flags, max_length),
            Ok(_) => return Outcome::Discarded,
            Err(_) => return Outcome::Fault(LocalFault::MalformedBehavior(category)),
        };

        let valid = validate_input(value, flags, max_length);
        if !valid {
            debug!("input for zone {} failed validation", zone_id);
        }

        let sequence = self.next_seq();
        Outcome::Send(Message::Input {
            session_id: self.session_id,
            sequence,
            zone_id,
            input_type: 0,
            validation_status: if valid { 0 } else { 1 },
            payload: Bytes::copy_from_slice(value.as_bytes()),
        })
    }

    /// Build the initial `"navigate"` event carrying a URL's path and query.
    pub fn navigate_event(&mut self, path_query: &str) -> Message {
        let sequence = self.next_seq();
        Message::Event {
            session_id: self.session_id,
            sequence,
            zone_id: 0,
            event_type: 0,
            timestamp: now_micros(),
            mouse_x: 0,
            mouse_y: 0,
            modifiers: 0,
            name: "navigate".to_string(),
            payload: Bytes::copy_from_slice(path_query.as_bytes()),
        }
    }

    fn navigate_outcome(&mut self, target: String, kind: NavigateKind) -> Outcome {
        if target.starts_with('/') {
            // A same-surface path navigation stays in this session: it goes
            // straight out as the "navigate" event. Everything else is the
            // renderer's job.
            return match kind {
                NavigateKind::Same => Outcome::Send(self.navigate_event(&target)),
                NavigateKind::New => Outcome::Navigate { target, kind },
            };
        }
        match PixnetUrl::parse(&target) {
            Ok(_) => Outcome::Navigate { target, kind },
            Err(e) => {
                warn!("navigate target {:?} rejected: {}", target, e);
                Outcome::Fault(LocalFault::BadUrl(target))
            }
        }
    }

    fn emit_event(
        &mut self,
        cid: u16,
        name: String,
        event_type: u8,
        debounce_ms: u16,
        x: u16,
        y: u16,
        modifiers: Modifiers,
    ) -> Outcome {
        let key = (cid, name.clone());
        let now = Instant::now();
        if let Some(last) = self.debounce.get(&key) {
            if now.duration_since(*last) < Duration::from_millis(debounce_ms as u64) {
                return Outcome::Discarded;
            }
        }
        self.debounce.insert(key, now);

        let sequence = self.next_seq();
        Outcome::Send(Message::Event {
            session_id: self.session_id,
            sequence,
            zone_id: cid,
            event_type,
            timestamp: now_micros(),
            mouse_x: x,
            mouse_y: y,
            modifiers: modifiers.bits(),
            name,
            payload: Bytes::new(),
        })
    }

    fn finish_drag(&mut self, src: u16, x: u16, y: u16) -> Outcome {
        self.drag = DragPhase::Idle;
        let target = self.page.category_at(x, y).and_then(|def| {
            matches!(def.behavior(), Ok(Behavior::DropZone { .. })).then_some(def.id)
        });
        match target {
            Some(dst) => self.drag_message(DragAction::Drop, src, dst, x, y),
            None => self.drag_message(DragAction::Cancel, src, 0, x, y),
        }
    }

    fn drag_message(
        &mut self,
        action: DragAction,
        src: u16,
        dst: u16,
        x: u16,
        y: u16,
    ) -> Outcome {
        Outcome::Send(Message::Drag {
            session_id: self.session_id,
            action,
            src,
            dst,
            mouse_x: x,
            mouse_y: y,
            data: self.drag_payload.clone(),
        })
    }
}

fn validate_input(value: &str, flags: ValidationFlags, max_length: u16) -> bool {
    if max_length != 0 && value.len() > max_length as usize {
        return false;
    }
    if flags.contains(ValidationFlags::REQUIRED) && value.is_empty() {
        return false;
    }
    if flags.contains(ValidationFlags::NUMERIC) && !value.is_empty() {
        if value.parse::<f64>().is_err() {
            return false;
        }
    }
    if flags.contains(ValidationFlags::EMAIL) && !value.is_empty() {
        // Structural check only; real verification is the application's job.
        let mut parts = value.splitn(2, '@');
        let local = parts.next().unwrap_or("");
        let domain = parts.next().unwrap_or("");
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return false;
        }
    }
    true
}

use crate::overlay::mapper::Size;
use tokio::sync::oneshot;

/// Identifies one assignment of an image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    source: String,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadSignal {
    /// The ticket was superseded or already completed.
    Stale,
    /// The current source finished loading; `deferred_render` is set when a
    /// render was requested while it was still loading.
    Loaded { natural: Size, deferred_render: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SlotState {
    Empty,
    Loading,
    Loaded(Size),
}

/// Tracks the image under the overlay and its one-shot "loaded" signal.
///
/// Each `assign` starts a new generation. Only the ticket of the latest
/// generation can complete it, and only once.
#[derive(Debug)]
pub struct ImageSlot {
    generation: u64,
    source: Option<String>,
    state: SlotState,
    render_pending: bool,
    waiters: Vec<oneshot::Sender<Size>>,
}

impl ImageSlot {
    pub fn new() -> Self {
        Self {
            generation: 0,
            source: None,
            state: SlotState::Empty,
            render_pending: false,
            waiters: Vec::new(),
        }
    }

    pub fn assign(&mut self, source: impl Into<String>) -> LoadTicket {
        let source = source.into();
        self.generation += 1;
        self.source = Some(source.clone());
        self.state = SlotState::Loading;
        // A render owed to the superseded source is still owed to this one.
        // Waiters on the previous source observe a closed channel.
        self.waiters.clear();
        LoadTicket {
            generation: self.generation,
            source,
        }
    }

    pub fn complete(&mut self, ticket: &LoadTicket, natural: Size) -> LoadSignal {
        if ticket.generation != self.generation || self.state != SlotState::Loading {
            return LoadSignal::Stale;
        }
        self.state = SlotState::Loaded(natural);
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(natural);
        }
        let deferred_render = std::mem::take(&mut self.render_pending);
        LoadSignal::Loaded {
            natural,
            deferred_render,
        }
    }

    /// Whether `ticket` belongs to the current assignment.
    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation && self.source.is_some()
    }

    /// Natural size when loaded; otherwise remembers that a render is owed.
    pub fn request_render(&mut self) -> Option<Size> {
        match self.state {
            SlotState::Loaded(natural) => Some(natural),
            SlotState::Loading => {
                self.render_pending = true;
                None
            }
            SlotState::Empty => None,
        }
    }

    /// Resolves with the natural size once the current source has loaded.
    pub fn loaded(&mut self) -> oneshot::Receiver<Size> {
        let (tx, rx) = oneshot::channel();
        match self.state {
            SlotState::Loaded(natural) => {
                let _ = tx.send(natural);
            }
            _ => self.waiters.push(tx),
        }
        rx
    }

    pub fn natural_size(&self) -> Option<Size> {
        match self.state {
            SlotState::Loaded(natural) => Some(natural),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.state == SlotState::Loading
    }

    pub fn clear(&mut self) {
        self.generation += 1;
        self.source = None;
        self.state = SlotState::Empty;
        self.render_pending = false;
        self.waiters.clear();
    }
}

impl Default for ImageSlot {
    fn default() -> Self {
        Self::new()
    }
}

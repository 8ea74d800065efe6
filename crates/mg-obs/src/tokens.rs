//! Token plumbing: feature-id table, the bounded token writer.

/// Host-assigned feature ids for every token kind the encoder can emit.
///
/// Carried as plain data through the encoder's constructor — there is no
/// process-wide feature registry, so two environments with different id
/// maps coexist in one process.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureIds {
    pub episode_completion_pct: u8,
    pub last_action: u8,
    pub last_action_move: u8,
    pub last_reward: u8,
    pub vibe: u8,
    pub tag: u8,
    pub cooldown_remaining: u8,
    pub remaining_uses: u8,
    pub goal: u8,
    /// `None` disables collective tokens entirely.
    pub collective: Option<u8>,
    pub lp_east: u8,
    pub lp_west: u8,
    pub lp_north: u8,
    pub lp_south: u8,
    pub aoe_mask: u8,
    pub territory: u8,
    /// Per-resource inventory feature ids, indexed by `ResourceId`.
    pub inventory: Vec<u8>,
}

impl FeatureIds {
    /// A contiguous assignment starting at 1 — the shape hosts use in
    /// practice and the fixture for every test in this workspace.
    pub fn dense(num_resources: usize) -> Self {
        let inventory = (0..num_resources).map(|i| 16 + i as u8).collect();
        Self {
            episode_completion_pct: 1,
            last_action: 2,
            last_action_move: 3,
            last_reward: 4,
            vibe: 5,
            tag: 6,
            cooldown_remaining: 7,
            remaining_uses: 8,
            goal: 9,
            collective: Some(10),
            lp_east: 11,
            lp_west: 12,
            lp_north: 13,
            lp_south: 14,
            aoe_mask: 15,
            territory: 15 + num_resources as u8 + 1,
            inventory,
        }
    }
}

// ── TokenCounts ───────────────────────────────────────────────────────────────

/// Accounting for one agent's encode pass.
///
/// The three fields partition the token budget unconditionally:
/// `written + dropped + free == num_tokens`.  `free` is the budget that
/// remained after every emitted token was accounted for, written or not —
/// it goes negative under overflow, and the deficit is exactly the dropped
/// count.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct TokenCounts {
    pub written: usize,
    pub dropped: usize,
    /// `num_tokens − written − dropped`; negative when the scene demanded
    /// more records than the buffer holds.
    pub free: i64,
}

// ── TokenWriter ───────────────────────────────────────────────────────────────

/// Bounded writer over one agent's `(num_tokens, 3)` byte row.
///
/// Never writes past the buffer: overflowing tokens are counted as dropped
/// and encoding continues, so a crowded window degrades instead of failing.
pub struct TokenWriter<'a> {
    buf: &'a mut [u8],
    cursor: usize,
    dropped: usize,
}

impl<'a> TokenWriter<'a> {
    /// `buf.len()` must be `3 * num_tokens`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        debug_assert_eq!(buf.len() % 3, 0);
        Self {
            buf,
            cursor: 0,
            dropped: 0,
        }
    }

    #[inline]
    pub fn write(&mut self, location: u8, feature: u8, value: u8) {
        if self.cursor + 3 > self.buf.len() {
            self.dropped += 1;
            return;
        }
        self.buf[self.cursor] = location;
        self.buf[self.cursor + 1] = feature;
        self.buf[self.cursor + 2] = value;
        self.cursor += 3;
    }

    /// Fill the unwritten tail with `0xFF` (empty) and report the counts.
    pub fn finish(self) -> TokenCounts {
        let written = self.cursor / 3;
        let total = self.buf.len() / 3;
        self.buf[self.cursor..].fill(0xFF);
        TokenCounts {
            written,
            dropped: self.dropped,
            free: total as i64 - written as i64 - self.dropped as i64,
        }
    }
}

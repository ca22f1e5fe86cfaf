//! Domain types for game rosters.
//!
//! Everything here is plain data: identifiers, the registration entry and
//! its ordered [`Roster`], the attendance history consumed by waitlist
//! priority, and the per-game [`GameState`] aggregate. The engine logic
//! lives in the sibling modules ([`crate::allocation`], [`crate::priority`],
//! [`crate::promotion`], [`crate::teams`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Default seat capacity for a game when none is configured
pub const DEFAULT_CAPACITY: Capacity = Capacity::new(15);

/// Unique identifier for a game
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(Uuid);

impl GameId {
    /// Creates a new random `GameId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `GameId` from a UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Seat capacity of a game
///
/// Counts seats, not registrations: a party of three occupies three seats.
/// Zero is a valid capacity and simply waitlists everyone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a new capacity
    #[must_use]
    pub const fn new(seats: u32) -> Self {
        Self(seats)
    }

    /// Returns the number of seats
    #[must_use]
    pub const fn seats(&self) -> u32 {
        self.0
    }

    /// Checks whether this capacity has no seats at all
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Capacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A participant's name - the identity key of a registration
///
/// Comparison and hashing are case-insensitive ("Alice" and "alice" are the
/// same participant); the originally entered casing is preserved for
/// display. Surrounding whitespace is trimmed on construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParticipantName(String);

impl ParticipantName {
    /// Creates a participant name, trimming surrounding whitespace
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    /// Returns the name as entered (trimmed)
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks whether the name is blank
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn canonical(&self) -> String {
        self.0.to_lowercase()
    }
}

impl PartialEq for ParticipantName {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for ParticipantName {}

impl Hash for ParticipantName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl std::fmt::Display for ParticipantName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Status of a registration entry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationStatus {
    /// Not yet decided by an allocation pass
    #[default]
    Unset,
    /// Holds seats against capacity
    Confirmed,
    /// Waiting for seats to free up
    Waitlisted,
    /// Withdrawn; the entry is kept, its seats are not
    Cancelled,
}

impl RegistrationStatus {
    /// Checks whether this status holds seats
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// Checks whether this status is waiting for seats
    #[must_use]
    pub const fn is_waitlisted(&self) -> bool {
        matches!(self, Self::Waitlisted)
    }

    /// Checks whether this entry has been withdrawn
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Checks whether this entry still awaits an allocation decision
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unset => "unset",
            Self::Confirmed => "confirmed",
            Self::Waitlisted => "waitlisted",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A single registration: one participant plus their guests
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationEntry {
    /// Participant identity (case-insensitive, unique per roster)
    pub name: ParticipantName,
    /// Guest names as entered; blank elements are kept but never counted
    pub guests: Vec<String>,
    /// When this registration was submitted (drives allocation order)
    pub submitted_at: DateTime<Utc>,
    /// Current allocation status
    pub status: RegistrationStatus,
    /// True once an operator has manually set the status; pinned entries
    /// are skipped by every automatic pass until the pin is cleared
    pub pinned: bool,
}

impl RegistrationEntry {
    /// Creates a fresh, undecided registration
    #[must_use]
    pub const fn new(
        name: ParticipantName,
        guests: Vec<String>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            guests,
            submitted_at,
            status: RegistrationStatus::Unset,
            pinned: false,
        }
    }

    /// Guests that actually count: trimmed, non-blank, in entry order
    pub fn active_guests(&self) -> impl Iterator<Item = &str> {
        self.guests
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
    }

    /// Seats this registration occupies: the registrant plus non-blank guests
    #[must_use]
    pub fn party_size(&self) -> u32 {
        party_seats(self.active_guests().count())
    }
}

/// Seats for one registrant plus `guests` companions, saturating at `u32::MAX`
fn party_seats(guests: usize) -> u32 {
    u32::try_from(guests).unwrap_or(u32::MAX).saturating_add(1)
}

/// Outcome of inserting a registration into a roster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No prior entry existed for this name
    Inserted,
    /// An unpinned entry was replaced wholesale (status reset to `Unset`,
    /// submission time refreshed)
    Replaced {
        /// Status of the replaced entry
        previous: RegistrationStatus,
    },
    /// The existing entry was pinned by an operator: status, pin, and
    /// submission time were kept, only the guest list was refreshed
    PinnedKept {
        /// Status the pinned entry retains
        status: RegistrationStatus,
    },
}

/// Ordered collection of registrations for one game
///
/// Insertion order is preserved and breaks exact-timestamp ties during
/// allocation. Names are unique, compared case-insensitively. The roster
/// owns the entry lifecycle (upsert, cancel, override, remove); the
/// allocation and promotion passes live in their own modules.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    entries: Vec<RegistrationEntry>,
}

impl Roster {
    /// Creates an empty roster
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builds a roster from existing entries, keeping their order
    #[must_use]
    pub fn from_entries(entries: Vec<RegistrationEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries (all statuses, cancelled included)
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether the roster has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order
    #[must_use]
    pub fn entries(&self) -> &[RegistrationEntry] {
        &self.entries
    }

    /// Iterates entries in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, RegistrationEntry> {
        self.entries.iter()
    }

    /// Looks up an entry by name (case-insensitive)
    #[must_use]
    pub fn get(&self, name: &ParticipantName) -> Option<&RegistrationEntry> {
        self.position(name).map(|i| &self.entries[i])
    }

    /// Checks whether a participant has an entry (any status)
    #[must_use]
    pub fn is_registered(&self, name: &ParticipantName) -> bool {
        self.position(name).is_some()
    }

    /// Entries with the given status, in insertion order
    pub fn with_status(
        &self,
        status: RegistrationStatus,
    ) -> impl Iterator<Item = &RegistrationEntry> {
        self.entries.iter().filter(move |e| e.status == status)
    }

    /// Total seats held by confirmed entries
    #[must_use]
    pub fn confirmed_seats(&self) -> u32 {
        self.with_status(RegistrationStatus::Confirmed)
            .fold(0u32, |acc, e| acc.saturating_add(e.party_size()))
    }

    /// Seats still open under the given capacity (zero when overbooked)
    #[must_use]
    pub fn seats_available(&self, capacity: Capacity) -> u32 {
        capacity.seats().saturating_sub(self.confirmed_seats())
    }

    /// Inserts or replaces a registration
    ///
    /// Resubmission with the same name idempotently replaces the entry in
    /// place (keeping its roster position): guests are replaced, the
    /// submission time resets, and the status returns to `Unset` for the
    /// next allocation pass. If the existing entry is pinned, the operator's
    /// decision stands: only the guest list is refreshed.
    pub fn upsert(
        &mut self,
        name: ParticipantName,
        guests: Vec<String>,
        submitted_at: DateTime<Utc>,
    ) -> UpsertOutcome {
        match self.position(&name) {
            None => {
                self.entries
                    .push(RegistrationEntry::new(name, guests, submitted_at));
                UpsertOutcome::Inserted
            }
            Some(i) if self.entries[i].pinned => {
                self.entries[i].guests = guests;
                UpsertOutcome::PinnedKept {
                    status: self.entries[i].status,
                }
            }
            Some(i) => {
                let previous = self.entries[i].status;
                self.entries[i] = RegistrationEntry::new(name, guests, submitted_at);
                UpsertOutcome::Replaced { previous }
            }
        }
    }

    /// Records an explicit cancellation
    ///
    /// The entry is kept with status `Cancelled` (never deleted); guests and
    /// submission time are refreshed. A cancellation is the participant's
    /// own statement, so it also clears any operator pin. Cancelling without
    /// a prior entry records a cancelled entry and returns `None`.
    pub fn record_cancellation(
        &mut self,
        name: ParticipantName,
        guests: Vec<String>,
        submitted_at: DateTime<Utc>,
    ) -> Option<RegistrationStatus> {
        match self.position(&name) {
            None => {
                let mut entry = RegistrationEntry::new(name, guests, submitted_at);
                entry.status = RegistrationStatus::Cancelled;
                self.entries.push(entry);
                None
            }
            Some(i) => {
                let previous = self.entries[i].status;
                let entry = &mut self.entries[i];
                entry.guests = guests;
                entry.submitted_at = submitted_at;
                entry.status = RegistrationStatus::Cancelled;
                entry.pinned = false;
                Some(previous)
            }
        }
    }

    /// Pins an entry to an operator-chosen status
    ///
    /// Returns the prior status, or `None` if the name is unknown. Pinned
    /// entries are excluded from automatic allocation and promotion until
    /// [`Roster::clear_override`].
    pub fn override_status(
        &mut self,
        name: &ParticipantName,
        status: RegistrationStatus,
    ) -> Option<RegistrationStatus> {
        let i = self.position(name)?;
        let previous = self.entries[i].status;
        self.entries[i].status = status;
        self.entries[i].pinned = true;
        Some(previous)
    }

    /// Clears an operator pin and resets the entry to `Unset`
    ///
    /// The next allocation pass re-decides the entry. Returns the status the
    /// entry had before the reset, or `None` if the name is unknown.
    pub fn clear_override(&mut self, name: &ParticipantName) -> Option<RegistrationStatus> {
        let i = self.position(name)?;
        let previous = self.entries[i].status;
        self.entries[i].status = RegistrationStatus::Unset;
        self.entries[i].pinned = false;
        Some(previous)
    }

    /// Removes an entry outright (operator delete)
    pub fn remove(&mut self, name: &ParticipantName) -> Option<RegistrationEntry> {
        let i = self.position(name)?;
        Some(self.entries.remove(i))
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [RegistrationEntry] {
        &mut self.entries
    }

    fn position(&self, name: &ParticipantName) -> Option<usize> {
        self.entries.iter().position(|e| e.name == *name)
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a RegistrationEntry;
    type IntoIter = std::slice::Iter<'a, RegistrationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A participant's attendance history - the input to waitlist priority
///
/// All counters are supplied by the caller (the engine never bookkeeps
/// attendance itself); a participant with no history is all zeros.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Games attended
    pub games_attended: u32,
    /// Games cancelled ahead of time
    pub games_cancelled: u32,
    /// Games skipped without cancelling
    pub games_no_show: u32,
    /// Consecutive recent attendances
    pub current_streak: u32,
}

impl AttendanceRecord {
    /// Creates a record from raw counters
    #[must_use]
    pub const fn new(
        games_attended: u32,
        games_cancelled: u32,
        games_no_show: u32,
        current_streak: u32,
    ) -> Self {
        Self {
            games_attended,
            games_cancelled,
            games_no_show,
            current_streak,
        }
    }

    /// Total games with a recorded outcome
    #[must_use]
    pub const fn games_recorded(&self) -> u32 {
        self.games_attended + self.games_cancelled + self.games_no_show
    }

    /// Attendance rate as a percentage (0.0 when nothing is recorded)
    #[must_use]
    pub fn attendance_rate(&self) -> f64 {
        let total = self.games_recorded();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.games_attended) / f64::from(total) * 100.0
    }
}

/// Non-negative waitlist priority score
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PriorityScore(u32);

impl PriorityScore {
    /// Creates a score from its raw value
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw score
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PriorityScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One dealt team: registrants and guests flattened to display names
///
/// Teams are ephemeral - regenerated on every request, never stored as
/// authoritative state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    players: Vec<String>,
}

impl Team {
    /// Creates a team from its players
    #[must_use]
    pub const fn new(players: Vec<String>) -> Self {
        Self { players }
    }

    /// Players on this team, in deal order
    #[must_use]
    pub fn players(&self) -> &[String] {
        &self.players
    }

    /// Number of players on this team
    #[must_use]
    pub fn size(&self) -> usize {
        self.players.len()
    }

    /// Checks whether the team is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Per-game aggregate state: capacity plus the roster
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Seat capacity for this game
    pub capacity: Capacity,
    /// The ordered roster
    pub roster: Roster,
    /// Last validation error (if any)
    pub last_error: Option<String>,
}

impl GameState {
    /// Creates an empty state with the given capacity
    #[must_use]
    pub const fn new(capacity: Capacity) -> Self {
        Self {
            capacity,
            roster: Roster::new(),
            last_error: None,
        }
    }

    /// Seats still open for this game
    #[must_use]
    pub fn seats_available(&self) -> u32 {
        self.roster.seats_available(self.capacity)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

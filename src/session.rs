//! Interactive configuration state machine.
//!
//! The session never touches the network or the terminal. Key presses come in
//! through [`ConfigSession::handle_key`]; anything that needs the outside world
//! goes back out as a [`SessionAction`] for the interactive loop to carry out.

use crate::config::ConfigStore;
use crate::registry::SceneRegistry;
use crate::util::{
    step_numeric, validate_channel, validate_host_url, validate_universe, ValidationError,
    INPUT_CHAR_LIMIT,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Rows of the settings table, top to bottom.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EditField {
    Universe,
    Channel,
    RemoteHost,
    SceneList,
    Save,
}

impl EditField {
    pub const ALL: [EditField; 5] = [
        EditField::Universe,
        EditField::Channel,
        EditField::RemoteHost,
        EditField::SceneList,
        EditField::Save,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EditField::Universe => "Universe",
            EditField::Channel => "Channel",
            EditField::RemoteHost => "LedFx Host",
            EditField::SceneList => "Scenes",
            EditField::Save => "[Save]",
        }
    }

    fn is_scalar(&self) -> bool {
        matches!(self, EditField::Universe | EditField::Channel | EditField::RemoteHost)
    }

    fn is_numeric(&self) -> bool {
        matches!(self, EditField::Universe | EditField::Channel)
    }

    /// Runs the field's validator over an edit buffer.
    pub fn validate(&self, buffer: &str) -> Result<FieldValue, ValidationError> {
        match self {
            EditField::Universe => validate_universe(buffer).map(FieldValue::Universe),
            EditField::Channel => validate_channel(buffer).map(FieldValue::Channel),
            EditField::RemoteHost => validate_host_url(buffer).map(FieldValue::RemoteHost),
            // Not editable as text; nothing a buffer could hold is valid.
            EditField::SceneList | EditField::Save => Err(ValidationError::NotANumber),
        }
    }

    /// Committed value as shown in the settings table.
    pub fn display_value(&self, store: &ConfigStore, registry: &SceneRegistry) -> String {
        match self {
            EditField::Universe => store.data.universe.to_string(),
            EditField::Channel => store.data.channel.to_string(),
            EditField::RemoteHost => store.data.ledfx_host.clone(),
            EditField::SceneList => format!("{} Scenes", registry.scenes().len()),
            EditField::Save => String::new(),
        }
    }
}

/// A validated edit, ready to be committed.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum FieldValue {
    Universe(u16),
    Channel(u16),
    RemoteHost(String),
}

/// Text input focused on one scalar field.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FieldEditor {
    pub field: EditField,
    pub buffer: String,
    pub error: Option<ValidationError>,
}

impl FieldEditor {
    fn new(field: EditField, value: String) -> Self {
        let mut editor = Self {
            field,
            buffer: value,
            error: None,
        };
        editor.revalidate();
        editor
    }

    fn revalidate(&mut self) {
        self.error = self.field.validate(&self.buffer).err();
    }

    fn set_buffer(&mut self, value: String) {
        self.buffer = value;
        self.revalidate();
    }

    fn insert(&mut self, c: char) {
        if self.buffer.chars().count() < INPUT_CHAR_LIMIT {
            self.buffer.push(c);
            self.revalidate();
        }
    }

    fn backspace(&mut self) {
        self.buffer.pop();
        self.revalidate();
    }
}

/// Staged copy of the scene list.
///
/// Cursor 0 is the "fetch from LedFx" row; cursor `n` (1-based) is staged item
/// `n - 1`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SceneListEditor {
    pub staged: Vec<String>,
    pub cursor: usize,
    pub candidates: Vec<String>,
    pub fetching: bool,
}

impl SceneListEditor {
    fn new(committed: &[String]) -> Self {
        Self {
            staged: committed.to_vec(),
            cursor: 0,
            candidates: vec![],
            fetching: false,
        }
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        if self.cursor < self.staged.len() {
            self.cursor += 1;
        }
    }

    /// Swaps the item under the cursor with its predecessor. No-op on the first item.
    pub fn move_up(&mut self) {
        if self.cursor > 1 {
            self.staged.swap(self.cursor - 2, self.cursor - 1);
            self.cursor -= 1;
        }
    }

    /// Swaps the item under the cursor with its successor. No-op on the last item.
    pub fn move_down(&mut self) {
        if self.cursor > 0 && self.cursor < self.staged.len() {
            self.staged.swap(self.cursor - 1, self.cursor);
            self.cursor += 1;
        }
    }

    pub fn remove_selected(&mut self) {
        if self.cursor > 0 && self.cursor <= self.staged.len() {
            self.staged.remove(self.cursor - 1);
            self.cursor = self.cursor.min(self.staged.len());
        }
    }

    fn adopt_candidates(&mut self) {
        self.staged = self.candidates.clone();
        self.cursor = 0;
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Mode {
    Browsing,
    EditingField(FieldEditor),
    EditingSceneList(SceneListEditor),
}

/// How many UI ticks a status message stays up.
pub const STATUS_TICKS: usize = 20;

/// Transient message shown under the settings.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum StatusLine {
    Info(String),
    Error(String),
}

/// Work the session hands back to the interactive loop.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SessionAction {
    Quit,
    /// Ask LedFx for its scene list.
    FetchScenes { host: String },
    /// The committed universe changed; producers must follow.
    UniverseChanged(u16),
}

#[derive(Debug)]
pub struct ConfigSession {
    mode: Mode,
    cursor: usize,
    dirty: bool,
    status: Option<StatusLine>,
    status_age: usize,
}

impl ConfigSession {
    /// A session over freshly loaded configuration. A store that did not come
    /// from disk starts out unsaved.
    pub fn new(store: &ConfigStore) -> Self {
        Self {
            mode: Mode::Browsing,
            cursor: 0,
            dirty: !store.from_file(),
            status: None,
            status_age: 0,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn selected(&self) -> EditField {
        EditField::ALL[self.cursor]
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    fn show(&mut self, status: StatusLine) {
        self.status = Some(status);
        self.status_age = 0;
    }

    /// Called once per UI tick. Status messages are dropped after
    /// [`STATUS_TICKS`] ticks.
    pub fn age_status(&mut self) {
        if self.status.is_none() {
            return;
        }
        self.status_age += 1;
        if self.status_age >= STATUS_TICKS {
            self.status = None;
        }
    }

    // --- Browsing ---

    pub fn select_previous(&mut self) {
        if self.mode == Mode::Browsing && self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn select_next(&mut self) {
        if self.mode == Mode::Browsing && self.cursor < EditField::ALL.len() - 1 {
            self.cursor += 1;
        }
    }

    /// Enter/Space on the selected row while browsing.
    pub fn activate_selected(&mut self, store: &mut ConfigStore, registry: &SceneRegistry) {
        if self.mode != Mode::Browsing {
            return;
        }
        let field = self.selected();
        if field.is_scalar() {
            let value = field.display_value(store, registry);
            log::debug!("Editing {} (was '{}')", field.label(), value);
            self.mode = Mode::EditingField(FieldEditor::new(field, value));
        } else if field == EditField::SceneList {
            self.mode = Mode::EditingSceneList(SceneListEditor::new(registry.scenes()));
        } else {
            self.save(store);
        }
    }

    /// Writes the committed configuration. Only does anything while dirty.
    pub fn save(&mut self, store: &mut ConfigStore) {
        if !self.dirty {
            log::debug!("Save ignored: nothing changed.");
            return;
        }
        match store.save() {
            Ok(()) => {
                self.dirty = false;
                self.show(StatusLine::Info(format!(
                    "Saved to {}",
                    store.path().display()
                )));
            }
            Err(e) => {
                log::error!("Failed to save configuration: {}", e);
                self.show(StatusLine::Error(format!("Save failed: {}", e)));
            }
        }
    }

    // --- Field editing ---

    pub fn editor(&self) -> Option<&FieldEditor> {
        match &self.mode {
            Mode::EditingField(editor) => Some(editor),
            _ => None,
        }
    }

    fn editor_mut(&mut self) -> Option<&mut FieldEditor> {
        match &mut self.mode {
            Mode::EditingField(editor) => Some(editor),
            _ => None,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        if let Some(editor) = self.editor_mut() {
            editor.insert(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(editor) = self.editor_mut() {
            editor.backspace();
        }
    }

    pub fn clear_buffer(&mut self) {
        if let Some(editor) = self.editor_mut() {
            editor.set_buffer(String::new());
        }
    }

    /// Up/Down inside a numeric field.
    pub fn step_value(&mut self, up: bool) {
        if let Some(editor) = self.editor_mut() {
            if !editor.field.is_numeric() {
                return;
            }
            if let Some(next) = step_numeric(&editor.buffer, up) {
                editor.set_buffer(next);
            }
        }
    }

    /// Commits the edit buffer if it validates. An invalid buffer keeps the
    /// editor open with its error showing.
    pub fn confirm_edit(&mut self, store: &mut ConfigStore) -> Option<SessionAction> {
        let editor = self.editor_mut()?;
        let value = match editor.field.validate(&editor.buffer) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("Confirm blocked for {}: {}", editor.field.label(), e);
                editor.error = Some(e);
                return None;
            }
        };
        self.mode = Mode::Browsing;

        let data = &mut store.data;
        let mut action = None;
        let changed = match value {
            FieldValue::Universe(universe) => {
                let changed = data.universe != universe;
                data.universe = universe;
                if changed {
                    action = Some(SessionAction::UniverseChanged(universe));
                }
                changed
            }
            FieldValue::Channel(channel) => {
                let changed = data.channel != channel;
                data.channel = channel;
                changed
            }
            FieldValue::RemoteHost(host) => {
                let changed = data.ledfx_host != host;
                data.ledfx_host = host;
                changed
            }
        };
        if changed {
            self.dirty = true;
        }
        action
    }

    // --- Scene list ---

    pub fn scene_list(&self) -> Option<&SceneListEditor> {
        match &self.mode {
            Mode::EditingSceneList(list) => Some(list),
            _ => None,
        }
    }

    fn scene_list_mut(&mut self) -> Option<&mut SceneListEditor> {
        match &mut self.mode {
            Mode::EditingSceneList(list) => Some(list),
            _ => None,
        }
    }

    /// Enter on the fetch row: adopt fetched candidates if there are any,
    /// otherwise ask LedFx for them.
    pub fn fetch_or_adopt(&mut self, store: &ConfigStore) -> Option<SessionAction> {
        let list = self.scene_list_mut()?;
        if list.cursor != 0 {
            return None;
        }
        if !list.candidates.is_empty() {
            list.adopt_candidates();
            let count = list.staged.len();
            self.show(StatusLine::Info(format!("Staged {} scenes from LedFx", count)));
            return None;
        }
        list.fetching = true;
        Some(SessionAction::FetchScenes {
            host: store.data.ledfx_host.clone(),
        })
    }

    /// Scene names from LedFx arrived. Ignored outside the scene list editor.
    pub fn receive_candidates(&mut self, mut names: Vec<String>) {
        let Some(list) = self.scene_list_mut() else {
            log::debug!("Scene list arrived outside the scene editor, ignoring.");
            return;
        };
        names.sort();
        list.candidates = names;
        list.fetching = false;
        let message = if list.candidates.is_empty() {
            "LedFx reports no scenes".to_string()
        } else {
            format!(
                "{} scenes available, Enter on the first row to use them",
                list.candidates.len()
            )
        };
        self.show(StatusLine::Info(message));
    }

    /// A remote call failed. Shown for a few seconds.
    pub fn report_remote_error(&mut self, message: String) {
        if let Some(list) = self.scene_list_mut() {
            list.fetching = false;
        }
        self.show(StatusLine::Error(message));
    }

    /// Ctrl+S in the scene editor: the staged list becomes the committed one.
    pub fn commit_scene_list(&mut self, store: &mut ConfigStore, registry: &mut SceneRegistry) {
        if !matches!(self.mode, Mode::EditingSceneList(_)) {
            return;
        }
        let Mode::EditingSceneList(list) = std::mem::replace(&mut self.mode, Mode::Browsing) else {
            return;
        };
        log::info!("Committing {} scenes", list.staged.len());
        store.data.scenes = list.staged.clone();
        registry.replace_scenes(list.staged);
        self.dirty = true;
    }

    /// Esc: back to browsing, dropping any uncommitted edit.
    pub fn cancel(&mut self) {
        if self.mode != Mode::Browsing {
            log::debug!("Edit cancelled.");
            self.mode = Mode::Browsing;
        }
    }

    // --- Key mapping ---

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        store: &mut ConfigStore,
        registry: &mut SceneRegistry,
    ) -> Option<SessionAction> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            return Some(SessionAction::Quit);
        }
        if key.code == KeyCode::Esc {
            self.cancel();
            return None;
        }

        match self.mode {
            Mode::Browsing => match key.code {
                KeyCode::Char('q') if !ctrl => return Some(SessionAction::Quit),
                KeyCode::Up => self.select_previous(),
                KeyCode::Char('k') | KeyCode::Char('w') if !ctrl => self.select_previous(),
                KeyCode::Down => self.select_next(),
                KeyCode::Char('j') | KeyCode::Char('s') if !ctrl => self.select_next(),
                KeyCode::Enter => self.activate_selected(store, registry),
                KeyCode::Char(' ') if !ctrl => self.activate_selected(store, registry),
                _ => {}
            },
            Mode::EditingField(_) => match key.code {
                KeyCode::Enter => return self.confirm_edit(store),
                KeyCode::Up => self.step_value(true),
                KeyCode::Down => self.step_value(false),
                KeyCode::Tab => self.clear_buffer(),
                KeyCode::Backspace => self.backspace(),
                KeyCode::Char(c) if !ctrl => self.insert_char(c),
                _ => {}
            },
            Mode::EditingSceneList(_) => match key.code {
                KeyCode::Char('s') if ctrl => self.commit_scene_list(store, registry),
                KeyCode::Up | KeyCode::Char('k' | 'w') if key.code == KeyCode::Up || !ctrl => {
                    if let Some(list) = self.scene_list_mut() {
                        list.cursor_up();
                    }
                }
                KeyCode::Down | KeyCode::Char('j' | 's') if key.code == KeyCode::Down || !ctrl => {
                    if let Some(list) = self.scene_list_mut() {
                        list.cursor_down();
                    }
                }
                KeyCode::PageUp => {
                    if let Some(list) = self.scene_list_mut() {
                        list.move_up();
                    }
                }
                KeyCode::PageDown => {
                    if let Some(list) = self.scene_list_mut() {
                        list.move_down();
                    }
                }
                KeyCode::Delete => {
                    if let Some(list) = self.scene_list_mut() {
                        list.remove_selected();
                    }
                }
                KeyCode::Enter | KeyCode::Char(' ') => return self.fetch_or_adopt(store),
                _ => {}
            },
        }
        None
    }
}

pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const DEFAULT_WINDOW_TITLE: &str = "GeoGebra";
pub(crate) const DEFAULT_WINDOW_WIDTH: f64 = 1024.0;
pub(crate) const DEFAULT_WINDOW_HEIGHT: f64 = 768.0;

pub(crate) const APP_PROTOCOL_SCHEME: &str = "app";
pub(crate) const APP_PROTOCOL_HOST: &str = "localhost";
pub(crate) const DEFAULT_ENTRY_RESOURCE: &str = "html/index.html";

pub(crate) const EXAM_ON_MARKER: &str = "GGB_EXAM_ON";
pub(crate) const EXAM_OFF_MARKER: &str = "GGB_EXAM_OFF";
pub(crate) const SET_UNSAVED_MARKER: &str = "SETUNSAVED";

pub(crate) const GIAC_CALL_PREFIX: &str = "caseval(";
pub(crate) const EVALUATOR_FALLBACK_RESULT: &str = "?";
pub(crate) const GIAC_LIBRARY_ENV: &str = "GGB_GIAC_LIBRARY";
pub(crate) const GIAC_LIBRARY_NAME: &str = "giac";

pub(crate) const RESOURCE_DIR_ENV: &str = "GGB_RESOURCE_DIR";
pub(crate) const KEY_BLOCKER_CMD_ENV: &str = "GGB_KEY_BLOCKER_CMD";
pub(crate) const KEY_BLOCKER_EXECUTABLE: &str = "disablekeys.exe";
pub(crate) const UPDATER_EXECUTABLE: &str = "../Update.exe";
pub(crate) const APP_CONFIG_FILE: &str = "ggb-config.json";

pub(crate) const WINDOW_STATE_FILE: &str = "window-state.json";
pub(crate) const WINDOW_BOUNDS_SETTING: &str = "winBounds";

pub(crate) const SAVE_CHECK_SCRIPT: &str = "ggbApplet.checkSaved()";
pub(crate) const DISCARD_CLOSE_DELAY_MS: u64 = 100;

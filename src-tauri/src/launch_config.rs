use std::{
    env, fs,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use url::Url;

use crate::{
    launch_options::{LaunchOptions, LaunchTarget},
    APP_CONFIG_FILE, APP_PROTOCOL_HOST, APP_PROTOCOL_SCHEME, DEFAULT_ENTRY_RESOURCE,
};

const DEFAULT_UPDATE_BASE_URL: &str = "https://download.geogebra.org/installers/6.0/";
const DEDICATED_PERSPECTIVES: [&str; 3] = ["graphing", "geometry", "notes"];
const CLASSIC_APP_NAME: &str = "classic";

/// Build-time app settings shipped next to the resources as `ggb-config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct AppConfig {
    pub(crate) app_name: Option<String>,
    pub(crate) update_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: None,
            update_base_url: DEFAULT_UPDATE_BASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    pub(crate) fn update_feed_url(&self) -> String {
        match self.app_name.as_deref() {
            None | Some(CLASSIC_APP_NAME) | Some("") => self.update_base_url.clone(),
            Some(name) => format!("{}{}/", self.update_base_url, name),
        }
    }
}

pub(crate) fn load_app_config(resource_dir: &Path) -> AppConfig {
    let path = resource_dir.join(APP_CONFIG_FILE);
    if !path.exists() {
        return AppConfig::default();
    }
    match fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(%err, path = %path.display(), "failed to parse app config");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(%err, path = %path.display(), "failed to read app config");
            AppConfig::default()
        }
    }
}

/// Inputs that end up in the start URL's query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LaunchConfig {
    pub(crate) perspective: Option<String>,
    pub(crate) prerelease: Option<String>,
    pub(crate) debug: bool,
    pub(crate) filename: Option<String>,
    pub(crate) ggbbase64: Option<String>,
}

impl LaunchConfig {
    pub(crate) fn from_options(options: &LaunchOptions) -> Self {
        Self::from_options_in(options, &env::current_dir().unwrap_or_default())
    }

    fn from_options_in(options: &LaunchOptions, working_dir: &Path) -> Self {
        let mut config = Self {
            perspective: options.perspective.clone(),
            prerelease: options.prerelease.clone(),
            debug: options.debug,
            ..Self::default()
        };

        match &options.target {
            Some(LaunchTarget::Remote(url)) => {
                tracing::info!(%url, "attempt to open URL");
                config.filename = Some(url.clone());
            }
            Some(LaunchTarget::LocalFile(path)) => {
                tracing::info!(path = %path.display(), "attempt to load file");
                config.ggbbase64 = read_file_base64(&working_dir.join(path));
            }
            None => {}
        }

        config
    }
}

fn read_file_base64(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(STANDARD.encode(bytes)),
        Err(error) => {
            tracing::error!(%error, path = %path.display(), "cannot open file");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartLocation {
    pub(crate) url: Url,
    /// Resource-relative window icon for dedicated perspectives.
    pub(crate) icon: Option<PathBuf>,
}

pub(crate) fn app_origin() -> String {
    format!("{APP_PROTOCOL_SCHEME}://{APP_PROTOCOL_HOST}/")
}

pub(crate) fn build_start_location(
    launch: &LaunchConfig,
    app: &AppConfig,
) -> Result<StartLocation, url::ParseError> {
    let perspective = launch
        .perspective
        .as_deref()
        .or(app.app_name.as_deref())
        .filter(|perspective| !perspective.is_empty());
    let dedicated = perspective.filter(|p| DEDICATED_PERSPECTIVES.contains(p));

    let (entry, icon) = match dedicated {
        Some(name) => (
            format!("html/{name}.html"),
            Some(PathBuf::from("html").join(format!("{name}.ico"))),
        ),
        None => (DEFAULT_ENTRY_RESOURCE.to_string(), None),
    };

    let mut url = Url::parse(&app_origin())?.join(&entry)?;
    {
        let mut query = url.query_pairs_mut();
        if let (Some(perspective), None) = (perspective, dedicated) {
            query.append_pair("perspective", perspective);
        }
        let prerelease = launch
            .prerelease
            .as_deref()
            .or((perspective == Some("notes")).then_some("true"));
        if let Some(prerelease) = prerelease {
            query.append_pair("prerelease", prerelease);
        }
        if launch.debug {
            query.append_pair("debug", "true");
        }
        if let Some(filename) = &launch.filename {
            query.append_pair("filename", filename);
        }
        if let Some(ggbbase64) = &launch.ggbbase64 {
            query.append_pair("ggbbase64", ggbbase64);
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(StartLocation { url, icon })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_start_location_is_index() {
        let location =
            build_start_location(&LaunchConfig::default(), &AppConfig::default()).expect("url");
        assert_eq!(location.url.as_str(), "app://localhost/html/index.html");
        assert!(location.icon.is_none());
    }

    #[test]
    fn dedicated_perspective_selects_entry_and_icon() {
        let launch = LaunchConfig {
            perspective: Some("geometry".to_string()),
            ..LaunchConfig::default()
        };
        let location = build_start_location(&launch, &AppConfig::default()).expect("url");
        assert_eq!(location.url.as_str(), "app://localhost/html/geometry.html");
        assert_eq!(location.icon, Some(PathBuf::from("html/geometry.ico")));
    }

    #[test]
    fn notes_forces_prerelease_and_other_perspectives_go_to_query() {
        let app = AppConfig {
            app_name: Some("notes".to_string()),
            ..AppConfig::default()
        };
        let notes = build_start_location(&LaunchConfig::default(), &app).expect("url");
        assert_eq!(
            notes.url.as_str(),
            "app://localhost/html/notes.html?prerelease=true"
        );

        let launch = LaunchConfig {
            perspective: Some("AG".to_string()),
            debug: true,
            ..LaunchConfig::default()
        };
        let custom = build_start_location(&launch, &AppConfig::default()).expect("url");
        assert_eq!(
            custom.url.as_str(),
            "app://localhost/html/index.html?perspective=AG&debug=true"
        );
    }

    #[test]
    fn file_inputs_are_query_encoded() {
        let launch = LaunchConfig {
            filename: Some("https://www.geogebra.org/m/a b".to_string()),
            ggbbase64: Some("UEsDBA+/=".to_string()),
            ..LaunchConfig::default()
        };
        let location = build_start_location(&launch, &AppConfig::default()).expect("url");
        let pairs: Vec<(String, String)> = location
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (
                    "filename".to_string(),
                    "https://www.geogebra.org/m/a b".to_string()
                ),
                ("ggbbase64".to_string(), "UEsDBA+/=".to_string()),
            ]
        );
    }

    #[test]
    fn local_file_target_is_read_as_base64() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("circle.ggb"), b"PK\x03\x04").expect("write file");
        let options = LaunchOptions {
            target: Some(LaunchTarget::LocalFile(PathBuf::from("circle.ggb"))),
            ..LaunchOptions::default()
        };

        let config = LaunchConfig::from_options_in(&options, dir.path());
        assert_eq!(config.ggbbase64.as_deref(), Some("UEsDBA=="));
        assert!(config.filename.is_none());
    }

    #[test]
    fn unreadable_file_falls_back_to_default_locator() {
        let dir = tempfile::tempdir().expect("temp dir");
        let options = LaunchOptions {
            target: Some(LaunchTarget::LocalFile(PathBuf::from("missing.ggb"))),
            ..LaunchOptions::default()
        };

        let config = LaunchConfig::from_options_in(&options, dir.path());
        assert_eq!(config, LaunchConfig::default());
    }

    #[test]
    fn app_config_loads_and_derives_update_feed() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert_eq!(load_app_config(dir.path()), AppConfig::default());

        fs::write(
            dir.path().join(APP_CONFIG_FILE),
            r#"{"appName":"graphing"}"#,
        )
        .expect("write config");
        let config = load_app_config(dir.path());
        assert_eq!(config.app_name.as_deref(), Some("graphing"));
        assert_eq!(
            config.update_feed_url(),
            "https://download.geogebra.org/installers/6.0/graphing/"
        );

        fs::write(dir.path().join(APP_CONFIG_FILE), "not json").expect("write config");
        assert_eq!(load_app_config(dir.path()), AppConfig::default());
    }
}

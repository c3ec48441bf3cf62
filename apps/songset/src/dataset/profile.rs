use serde::{Deserialize, Serialize};

use crate::dataset::options::ContextOptions;

/// The listener's library snapshot, supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListenerProfile {
    #[serde(default)]
    pub top_tracks: Vec<String>,
    #[serde(default)]
    pub top_artists: Vec<String>,
    #[serde(default)]
    pub saved_albums: Vec<String>,
    #[serde(default)]
    pub saved_tracks: Vec<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Appends one labelled line per enabled, non-empty profile field to `base`.
pub fn compose_prompt(base: &str, profile: &ListenerProfile, options: &ContextOptions) -> String {
    let mut prompt = base.trim().to_string();

    let lists = [
        (options.include_top_tracks, "Top songs", &profile.top_tracks),
        (options.include_top_artists, "Top artists", &profile.top_artists),
        (options.include_saved_albums, "Saved albums", &profile.saved_albums),
        (options.include_saved_tracks, "Saved songs", &profile.saved_tracks),
    ];
    for (enabled, label, values) in lists {
        if enabled && !values.is_empty() {
            prompt.push_str(&format!("\n{label}: {}", values.join(", ")));
        }
    }

    if options.include_country {
        if let Some(country) = profile.country.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("\nCountry: {}", country.trim()));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ListenerProfile {
        ListenerProfile {
            top_tracks: vec!["Yellow".to_string(), "Creep".to_string()],
            top_artists: vec!["Coldplay".to_string()],
            saved_albums: vec![],
            saved_tracks: vec!["Wonderwall".to_string()],
            country: Some("SE".to_string()),
        }
    }

    #[test]
    fn test_no_options_leaves_prompt_alone() {
        assert_eq!(
            compose_prompt(" chill evening ", &profile(), &ContextOptions::default()),
            "chill evening"
        );
    }

    #[test]
    fn test_all_options_in_fixed_order() {
        let prompt = compose_prompt("chill evening", &profile(), &ContextOptions::all());
        assert_eq!(
            prompt,
            "chill evening\nTop songs: Yellow, Creep\nTop artists: Coldplay\nSaved songs: Wonderwall\nCountry: SE"
        );
    }

    #[test]
    fn test_empty_fields_are_skipped() {
        let options = ContextOptions {
            include_saved_albums: true,
            ..ContextOptions::default()
        };
        assert_eq!(compose_prompt("x", &profile(), &options), "x");
    }

    #[test]
    fn test_country_only() {
        let options = ContextOptions {
            include_country: true,
            ..ContextOptions::default()
        };
        assert_eq!(compose_prompt("x", &profile(), &options), "x\nCountry: SE");
    }
}

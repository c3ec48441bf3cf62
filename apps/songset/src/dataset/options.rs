use serde::{Deserialize, Serialize};

/// Which listener-profile fields are folded into a prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextOptions {
    #[serde(default)]
    pub include_top_tracks: bool,
    #[serde(default)]
    pub include_top_artists: bool,
    #[serde(default)]
    pub include_saved_albums: bool,
    #[serde(default)]
    pub include_saved_tracks: bool,
    #[serde(default)]
    pub include_country: bool,
}

impl ContextOptions {
    pub const FIELD_COUNT: u32 = 5;

    pub fn all() -> Self {
        Self {
            include_top_tracks: true,
            include_top_artists: true,
            include_saved_albums: true,
            include_saved_tracks: true,
            include_country: true,
        }
    }

    /// Every on/off combination (32), all-enabled first, flipping the last field fastest.
    pub fn all_combinations() -> Vec<Self> {
        (0..1u32 << Self::FIELD_COUNT)
            .map(|index| {
                // bit set = field disabled, most significant bit = first field
                let on = |field: u32| index & (1 << (Self::FIELD_COUNT - 1 - field)) == 0;
                Self {
                    include_top_tracks: on(0),
                    include_top_artists: on(1),
                    include_saved_albums: on(2),
                    include_saved_tracks: on(3),
                    include_country: on(4),
                }
            })
            .collect()
    }

    pub fn enabled_names(&self) -> Vec<&'static str> {
        [
            (self.include_top_tracks, "top_tracks"),
            (self.include_top_artists, "top_artists"),
            (self.include_saved_albums, "saved_albums"),
            (self.include_saved_tracks, "saved_tracks"),
            (self.include_country, "country"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

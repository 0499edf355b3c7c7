//! Core library for the narrated portfolio tour.
//!
//! The centre of the crate is [`TimelineAudioPlayer`], which keeps an audio
//! playback position in step with a timeline of page events, and
//! [`TourController`], which builds the tour's transport UI and turns fired
//! events into highlight and scroll actions on the page. The page itself, the
//! media element and persisted preferences are modelled headlessly so that
//! every behaviour can be driven from tests or the command line host.
//!
//! Smaller page helpers (image gallery, text scaling, page transitions) live
//! alongside and share the same [`Document`] model.

pub mod assets;
pub mod audio;
pub mod chrome;
pub mod config;
pub mod controls;
pub mod error;
pub mod gallery;
pub mod page;
pub mod player;
pub mod scaling;
pub mod settings;
pub mod timeline;
pub mod tour;

pub use assets::{AssetSource, DirectoryAssets, MemoryAssets};
pub use audio::{MediaHandle, SimulatedMedia};
pub use config::{HighlightConfig, PageConfig, TourConfig};
pub use controls::{PlayButton, PlayControl, PlayIcon, RangeControl, SeekControl};
pub use error::{Result, TourError};
pub use gallery::{GalleryImage, GalleryManifest, ImageGallery};
pub use page::{Document, Element, SharedDocument};
pub use player::{PlaybackCursor, PlayerInput, PlayerState, StartOutcome, TimelineAudioPlayer};
pub use scaling::{AverageCharMeasure, TextMeasure, TextScaler};
pub use settings::{FilePreferences, MemoryPreferences, PreferenceStore, SharedPreferences};
pub use timeline::{Timeline, TimelineEvent, TimelineLoadReport};
pub use tour::{TourController, UiEvent};

//! Temporal context windows over per-epoch features.
//!
//! A classifier looking at one epoch also sees `neighbors / 2` epochs before
//! and after it. Windows are laid side by side along the time axis:
//!
//! ```text
//! neighbors = 2, time = T
//!
//! epoch 0:  [  zeros  | e0 | e1 ]
//! epoch 1:  [   e0    | e1 | e2 ]
//! ...
//! epoch n:  [ e(n-1)  | en | zeros ]
//!           └──────── 3·T ────────┘
//! ```
//!
//! Context that falls outside the recording is zero-valued.
//!
//! # Example
//!
//! ```
//! use ndarray::Array4;
//! use psg_feature_extractor::sequence_builder::build_context_windows;
//!
//! let features = Array4::<f64>::ones((10, 4, 51, 75));
//! let windows = build_context_windows(&features, 2).unwrap();
//! assert_eq!(windows.shape(), &[10, 4, 51, 225]);
//! ```

mod window;

pub use window::{build_context_windows, ContextWindow};

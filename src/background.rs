//! MOG2 background model: turns a preprocessed frame into a binary
//! foreground mask of everything that doesn't match the learned background.

use opencv::core::{Mat, Ptr};
use opencv::video::{create_background_subtractor_mog2, BackgroundSubtractorMOG2};

pub struct BackgroundModel {
    subtractor: Ptr<dyn BackgroundSubtractorMOG2>,
}

impl BackgroundModel {
    /// `history` frames of memory, `var_threshold` pixel-model match
    /// sensitivity (lower = more sensitive). Shadow detection is always off;
    /// shadows cost extra cycles and this pipeline doesn't model ground
    /// contact.
    pub fn new(history: i32, var_threshold: f64) -> opencv::Result<Self> {
        Ok(Self {
            subtractor: create_background_subtractor_mog2(history, var_threshold, false)?,
        })
    }

    /// Applies the model to `frame`, returning the foreground mask and
    /// advancing the learned background.
    pub fn apply(&mut self, frame: &Mat) -> opencv::Result<Mat> {
        let mut mask = Mat::default();
        opencv::video::BackgroundSubtractor::apply(self.subtractor.as_mut(), frame, &mut mask, -1.0)?;
        Ok(mask)
    }
}

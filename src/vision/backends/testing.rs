//! Test doubles for exercising cycle ordering

use crossbeam_channel::{unbounded, Receiver, Sender};
use image::DynamicImage;
use std::marker::PhantomData;

use crate::vision::detector::{DetectionError, Detector};

/// Controls a [`GatedDetector`] from the test body
pub struct Gate {
    /// Send once to let one pending `detect` call return
    pub release: Sender<()>,
    /// Receives once per finished `detect` call
    pub finished: Receiver<()>,
}

/// Detector that blocks inside `detect` until the test releases it
pub struct GatedDetector<R, O> {
    gate: Receiver<()>,
    finished: Sender<()>,
    observations: Vec<O>,
    _request: PhantomData<fn(&R)>,
}

impl<R, O> GatedDetector<R, O> {
    pub fn new(observations: Vec<O>) -> (Self, Gate) {
        let (release, gate) = unbounded();
        let (finished_tx, finished) = unbounded();
        let detector = Self {
            gate,
            finished: finished_tx,
            observations,
            _request: PhantomData,
        };
        (detector, Gate { release, finished })
    }
}

impl<R, O> Detector for GatedDetector<R, O>
where
    O: Clone + Send + Sync,
{
    type Request = R;
    type Observation = O;

    fn name(&self) -> &'static str {
        "gated"
    }

    fn detect(&self, _image: &DynamicImage, _request: &R) -> Result<Vec<O>, DetectionError> {
        self.gate
            .recv()
            .map_err(|_| DetectionError::failed("gate dropped"))?;
        let _ = self.finished.send(());
        Ok(self.observations.clone())
    }
}

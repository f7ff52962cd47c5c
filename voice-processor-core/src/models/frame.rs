/// One fixed-size block of consecutive mono 16-bit samples.
///
/// Created by the capture worker once per complete device read and handed to
/// the frame consumer by value; the session keeps no copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    sequence: u64,
    samples: Box<[i16]>,
}

impl Frame {
    pub fn new(sequence: u64, samples: impl Into<Box<[i16]>>) -> Self {
        Self {
            sequence,
            samples: samples.into(),
        }
    }

    /// Position of this frame in its capture run, starting at 0.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

use crate::shared::descriptor::FaceDescriptor;

/// Descriptors captured by a finished enrollment, in capture order. Frozen.
#[derive(Clone, Debug, PartialEq)]
pub struct EnrollmentSet {
    descriptors: Vec<FaceDescriptor>,
}

impl EnrollmentSet {
    pub(crate) fn new(descriptors: Vec<FaceDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[FaceDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Comparison basis for verification. Replaced wholesale, never edited.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceSet {
    descriptors: Vec<FaceDescriptor>,
}

impl ReferenceSet {
    pub fn new(descriptors: Vec<FaceDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn descriptors(&self) -> &[FaceDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Length of the first entry.
    pub fn descriptor_len(&self) -> Option<usize> {
        self.descriptors.first().map(FaceDescriptor::len)
    }
}

impl From<EnrollmentSet> for ReferenceSet {
    fn from(set: EnrollmentSet) -> Self {
        Self::new(set.descriptors)
    }
}

use crate::common_types::VectorRecord;
use crate::error::{LearningError, LearningResult};

/// An ordered, index-addressable collection of records sharing one declared vector length.
///
/// Records can be appended, replaced by index or cleared, and mutated in place through
/// [`DataSet::records_mut`]; none of these can change a record's length.
#[derive(Debug, Clone)]
pub struct DataSet<R> {
    input_vector_length: usize,
    data: Vec<R>,
}

impl<R: VectorRecord> DataSet<R> {
    pub fn new(input_vector_length: usize) -> Self {
        DataSet { input_vector_length, data: Vec::new() }
    }

    pub fn with_capacity(input_vector_length: usize, capacity: usize) -> Self {
        DataSet { input_vector_length, data: Vec::with_capacity(capacity) }
    }

    /// Builds a dataset from existing records, checking every record's length.
    pub fn from_records(input_vector_length: usize, data: Vec<R>) -> LearningResult<Self> {
        for record in data.iter() {
            LearningError::check_dimension(input_vector_length, record.dimension())?;
        }
        Ok(DataSet { input_vector_length, data })
    }

    pub fn input_vector_length(&self) -> usize {
        self.input_vector_length
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn records(&self) -> &[R] {
        &self.data
    }

    /// Mutable access to the records. The slice itself cannot grow or shrink.
    pub fn records_mut(&mut self) -> &mut [R] {
        &mut self.data
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.data.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.data.iter()
    }

    /// Appends a record and returns its index.
    pub fn push(&mut self, record: R) -> LearningResult<usize> {
        LearningError::check_dimension(self.input_vector_length, record.dimension())?;
        self.data.push(record);
        Ok(self.data.len() - 1)
    }

    /// Overwrites the record at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range. Callers pick indices from the live dataset, so an
    /// out-of-range index is a bug, not a recoverable condition.
    pub fn replace(&mut self, index: usize, record: R) -> LearningResult<()> {
        assert!(
            index < self.data.len(),
            "Replacement index {} is out of range for a dataset of {} records.",
            index,
            self.data.len()
        );
        LearningError::check_dimension(self.input_vector_length, record.dimension())?;
        self.data[index] = record;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl<'a, R> IntoIterator for &'a DataSet<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

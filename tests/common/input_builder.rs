/// Assembles fuzz inputs field by field in decode order.
#[derive(Debug, Default, Clone)]
pub struct InputBuilder {
    bytes: Vec<u8>,
}

impl InputBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn byte(mut self, b: u8) -> Self {
        self.bytes.push(b);
        self
    }

    pub fn bytes(mut self, b: &[u8]) -> Self {
        self.bytes.extend_from_slice(b);
        self
    }

    /// One 8-byte dimension word.
    pub fn dim(mut self, d: i64) -> Self {
        self.bytes.extend_from_slice(&d.to_le_bytes());
        self
    }

    pub fn dims(self, ds: &[i64]) -> Self {
        ds.iter().fold(self, |b, &d| b.dim(d))
    }

    pub fn f32s(mut self, values: &[f32]) -> Self {
        for v in values {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
        self
    }

    pub fn f64(mut self, v: f64) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i32s(mut self, values: &[i32]) -> Self {
        for v in values {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

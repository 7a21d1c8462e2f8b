use async_trait::async_trait;
use parking_lot::RwLock;

use hybridrag_core::error::{Error, Result};
use hybridrag_core::traits::VectorIndex;
use hybridrag_core::types::{chunk_source, Document, VectorMatch, VectorRecord};

/// Brute-force index over squared Euclidean distance. Upserts replace rows
/// with the same id in place, so iteration order is first-insertion order.
#[derive(Default)]
pub struct MemoryVectorIndex {
	inner: RwLock<Rows>,
}

#[derive(Default)]
struct Rows {
	records: Vec<VectorRecord>,
	dim: Option<usize>,
}

impl Rows {
	fn check_dim(&self, len: usize) -> Result<()> {
		match self.dim {
			Some(d) if d != len => Err(Error::VectorIndex(format!("vector has {} dimensions, index holds {}", len, d))),
			_ => Ok(()),
		}
	}
}

impl MemoryVectorIndex {
	pub fn new() -> Self { Self::default() }
}

pub(crate) fn squared_l2(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum() }

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
	async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
		let Some(first) = records.first() else { return Ok(()) };
		if records.iter().any(|r| r.vector.len() != first.vector.len()) {
			return Err(Error::VectorIndex("records in one upsert must share a dimension".into()));
		}
		let mut rows = self.inner.write();
		rows.check_dim(first.vector.len())?;
		for record in records {
			match rows.records.iter_mut().find(|r| r.id == record.id) {
				Some(existing) => *existing = record.clone(),
				None => rows.records.push(record.clone()),
			}
		}
		rows.dim = Some(first.vector.len());
		Ok(())
	}

	async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
		let guard = self.inner.read();
		guard.check_dim(vector.len())?;
		let rows = &guard.records;
		let mut scored: Vec<(usize, f32)> = rows.iter().enumerate().map(|(i, r)| (i, squared_l2(&r.vector, vector))).collect();
		scored.sort_by(|a, b| a.1.total_cmp(&b.1));
		scored.truncate(top_k);
		Ok(scored
			.into_iter()
			.map(|(i, distance)| VectorMatch { id: rows[i].id.clone(), content: rows[i].content.clone(), metadata: rows[i].metadata.clone(), distance })
			.collect())
	}

	async fn get_all(&self) -> Result<Vec<Document>> { Ok(self.inner.read().records.iter().cloned().map(Document::from).collect()) }

	async fn count(&self) -> Result<usize> { Ok(self.inner.read().records.len()) }

	async fn delete_source(&self, source_ref: &str) -> Result<Vec<String>> {
		let mut rows = self.inner.write();
		let mut removed = Vec::new();
		rows.records.retain(|r| {
			let owned = chunk_source(&r.id) == Some(source_ref);
			if owned { removed.push(r.id.clone()); }
			!owned
		});
		Ok(removed)
	}

	async fn clear(&self) -> Result<()> {
		*self.inner.write() = Rows::default();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn squared_distance() {
		assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
		assert_eq!(squared_l2(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
	}
}

//! LanceDB-backed [`VectorIndex`].
//!
//! One table per index with the layout from [`crate::schema`]. Upserts go
//! through `merge_insert` keyed on `id`; queries read `_distance` (squared
//! L2) from the vector search result.
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use hybridrag_core::error::{Error, Result};
use hybridrag_core::traits::VectorIndex;
use hybridrag_core::types::{chunk_source, Document, Meta, VectorMatch, VectorRecord};

use crate::schema::build_arrow_schema;

fn lance_err(e: lancedb::Error) -> Error { Error::VectorIndex(e.to_string()) }

pub struct LanceVectorIndex {
	db: Connection,
	table_name: String,
	dim: usize,
}

impl LanceVectorIndex {
	pub async fn open(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
		let db = connect(db_path.to_string_lossy().as_ref()).execute().await.map_err(lance_err)?;
		info!("Opened LanceDB at {} (table {}, {} dims)", db_path.display(), table_name, dim);
		Ok(Self { db, table_name: table_name.to_string(), dim })
	}

	pub fn table_name(&self) -> &str { &self.table_name }

	async fn table_exists(&self) -> Result<bool> {
		Ok(self.db.table_names().execute().await.map_err(lance_err)?.contains(&self.table_name))
	}

	async fn ensure_table(&self) -> Result<lancedb::Table> {
		if !self.table_exists().await? {
			let schema = build_arrow_schema(self.dim_i32()?);
			let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
			self.db.create_table(&self.table_name, Box::new(iter)).execute().await.map_err(lance_err)?;
			debug!("Created LanceDB table {}", self.table_name);
		}
		self.db.open_table(&self.table_name).execute().await.map_err(lance_err)
	}

	fn dim_i32(&self) -> Result<i32> {
		i32::try_from(self.dim).map_err(|_| Error::VectorIndex(format!("dimension {} too large", self.dim)))
	}

	fn check_dim(&self, len: usize) -> Result<()> {
		if len == self.dim { Ok(()) } else { Err(Error::VectorIndex(format!("vector has {} dimensions, table expects {}", len, self.dim))) }
	}

	fn records_to_batch(&self, records: &[VectorRecord]) -> Result<RecordBatch> {
		let mut ids = Vec::with_capacity(records.len());
		let mut contents = Vec::with_capacity(records.len());
		let mut metadata = Vec::with_capacity(records.len());
		let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(records.len());
		for r in records {
			self.check_dim(r.vector.len())?;
			ids.push(r.id.clone());
			contents.push(r.content.clone());
			metadata.push(serde_json::to_string(&r.metadata).map_err(|e| Error::VectorIndex(format!("metadata encode: {e}")))?);
			vectors.push(Some(r.vector.iter().map(|&x| Some(x)).collect()));
		}
		RecordBatch::try_new(build_arrow_schema(self.dim_i32()?), vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(StringArray::from(contents)),
			Arc::new(StringArray::from(metadata)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), self.dim_i32()?)),
		])
		.map_err(|e| Error::VectorIndex(e.to_string()))
	}
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| Error::VectorIndex(format!("{name} column missing")))
}

fn parse_metadata(raw: &str) -> Meta { serde_json::from_str(raw).unwrap_or_default() }

fn sql_quote(raw: &str) -> String { format!("'{}'", raw.replace('\'', "''")) }

#[async_trait]
impl VectorIndex for LanceVectorIndex {
	async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
		if records.is_empty() { return Ok(()); }
		let batch = self.records_to_batch(records)?;
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		let table = self.ensure_table().await?;
		let mut mi = table.merge_insert(&["id"]);
		mi.when_matched_update_all(None).when_not_matched_insert_all();
		mi.execute(reader).await.map_err(lance_err)?;
		debug!("Upserted {} rows into {}", records.len(), self.table_name);
		Ok(())
	}

	async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
		self.check_dim(vector.len())?;
		if top_k == 0 || !self.table_exists().await? { return Ok(Vec::new()); }
		let table = self.db.open_table(&self.table_name).execute().await.map_err(lance_err)?;
		let mut stream = table.vector_search(vector.to_vec()).map_err(lance_err)?.limit(top_k).execute().await.map_err(lance_err)?;
		let mut matches = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(lance_err)? {
			let ids = string_column(&batch, "id")?;
			let contents = string_column(&batch, "content")?;
			let metadata = string_column(&batch, "metadata")?;
			let distances = batch
				.column_by_name("_distance")
				.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
				.ok_or_else(|| Error::VectorIndex("_distance column missing".into()))?;
			for i in 0..batch.num_rows() {
				matches.push(VectorMatch {
					id: ids.value(i).to_string(),
					content: contents.value(i).to_string(),
					metadata: parse_metadata(metadata.value(i)),
					distance: if distances.is_null(i) { f32::INFINITY } else { distances.value(i) },
				});
			}
		}
		matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
		matches.truncate(top_k);
		Ok(matches)
	}

	async fn get_all(&self) -> Result<Vec<Document>> {
		if !self.table_exists().await? { return Ok(Vec::new()); }
		let table = self.db.open_table(&self.table_name).execute().await.map_err(lance_err)?;
		let mut stream = table.query().execute().await.map_err(lance_err)?;
		let mut docs = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(lance_err)? {
			let ids = string_column(&batch, "id")?;
			let contents = string_column(&batch, "content")?;
			let metadata = string_column(&batch, "metadata")?;
			for i in 0..batch.num_rows() {
				docs.push(Document { id: ids.value(i).to_string(), content: contents.value(i).to_string(), metadata: parse_metadata(metadata.value(i)) });
			}
		}
		Ok(docs)
	}

	async fn count(&self) -> Result<usize> {
		if !self.table_exists().await? { return Ok(0); }
		let table = self.db.open_table(&self.table_name).execute().await.map_err(lance_err)?;
		table.count_rows(None).await.map_err(lance_err)
	}

	async fn delete_source(&self, source_ref: &str) -> Result<Vec<String>> {
		if !self.table_exists().await? { return Ok(Vec::new()); }
		let table = self.db.open_table(&self.table_name).execute().await.map_err(lance_err)?;
		// LIKE only narrows the scan; ownership is decided by chunk_source
		let filter = format!("id LIKE {}", sql_quote(&format!("{source_ref}:%")));
		let mut stream = table.query().only_if(filter).execute().await.map_err(lance_err)?;
		let mut ids = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(lance_err)? {
			let column = string_column(&batch, "id")?;
			for i in 0..batch.num_rows() {
				let id = column.value(i);
				if chunk_source(id) == Some(source_ref) { ids.push(id.to_string()); }
			}
		}
		if ids.is_empty() { return Ok(ids); }
		let predicate = format!("id IN ({})", ids.iter().map(|id| sql_quote(id)).collect::<Vec<_>>().join(", "));
		table.delete(&predicate).await.map_err(lance_err)?;
		debug!("Deleted {} rows of {} from {}", ids.len(), source_ref, self.table_name);
		Ok(ids)
	}

	async fn clear(&self) -> Result<()> {
		if !self.table_exists().await? { return Ok(()); }
		let table = self.db.open_table(&self.table_name).execute().await.map_err(lance_err)?;
		table.delete("id IS NOT NULL").await.map_err(lance_err)?;
		info!("Cleared table {}", self.table_name);
		Ok(())
	}
}

use crate::{
    KVStore, KeyEncoder, QueueBackend, RecordStore, Result, StorageError,
    Transaction as KVTransaction,
};
use berth_core::{Cluster, Deployment};
use bytes::Bytes;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

// Table definitions
const RESOURCES_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("resources");
const QUEUE_ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("queue_items");
const QUEUE_CURSORS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("queue_cursors");

/// redb-based storage backend
///
/// Holds cluster and deployment records as JSON in `resources`, and every
/// named queue as a run of sequence-numbered slots in `queue_items` bounded by
/// head/tail cursors in `queue_cursors`.
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Open (or create) a database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Opening redb database at: {}", path.as_ref().display());

        let db = Database::create(path.as_ref())?;
        let backend = Self { db: Arc::new(db) };
        backend.ensure_tables()?;

        info!("redb database initialized successfully");
        Ok(backend)
    }

    /// Create an ephemeral in-memory database
    pub fn in_memory() -> Result<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let backend = Self { db: Arc::new(db) };
        backend.ensure_tables()?;

        debug!("in-memory redb database initialized");
        Ok(backend)
    }

    fn ensure_tables(&self) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(RESOURCES_TABLE)?;
            let _ = write_txn.open_table(QUEUE_ITEMS_TABLE)?;
            let _ = write_txn.open_table(QUEUE_CURSORS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_record<T: for<'de> serde::Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key.as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn put_record<T: serde::Serialize>(&self, key: &str, record: &T) -> Result<()> {
        let data = serde_json::to_vec(record)?;
        self.put(key.as_bytes(), &data)
    }
}

/// Read a queue cursor, treating a missing cursor as slot 0
fn read_cursor(table: &impl ReadableTable<&'static str, u64>, key: &str) -> Result<u64> {
    Ok(table.get(key)?.map(|guard| guard.value()).unwrap_or(0))
}

impl KVStore for RedbBackend {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>> {
        debug!("Getting key: {:?}", String::from_utf8_lossy(key));

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESOURCES_TABLE)?;

        match table.get(key)? {
            Some(value) => Ok(Some(Bytes::from(value.value().to_vec()))),
            None => Ok(None),
        }
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        debug!("Putting key: {:?}", String::from_utf8_lossy(key));

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RESOURCES_TABLE)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;

        Ok(())
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Bytes, Bytes)>> {
        debug!("Scanning with prefix: {:?}", String::from_utf8_lossy(prefix));

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESOURCES_TABLE)?;

        let mut results = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let key_bytes = key.value();

            if key_bytes.starts_with(prefix) {
                results.push((
                    Bytes::from(key_bytes.to_vec()),
                    Bytes::from(value.value().to_vec()),
                ));
            }
        }

        debug!("Scan found {} results", results.len());
        Ok(results)
    }

    fn transaction(&self) -> Result<Box<dyn KVTransaction>> {
        let write_txn = self.db.begin_write()?;
        Ok(Box::new(RedbTransaction {
            txn: Some(write_txn),
        }))
    }
}

impl RecordStore for RedbBackend {
    fn get_cluster(&self, id: &str) -> Result<Option<Cluster>> {
        self.get_record(&KeyEncoder::cluster_key(id))
    }

    fn put_cluster(&self, cluster: &Cluster) -> Result<()> {
        self.put_record(&KeyEncoder::cluster_key(&cluster.id), cluster)
    }

    fn list_clusters(&self) -> Result<Vec<Cluster>> {
        let prefix = KeyEncoder::encode_prefix(KeyEncoder::CLUSTER);
        let mut clusters = Vec::new();
        for (_key, data) in self.scan(prefix.as_bytes())? {
            clusters.push(serde_json::from_slice(&data)?);
        }
        Ok(clusters)
    }

    fn get_deployment(&self, id: &str) -> Result<Option<Deployment>> {
        self.get_record(&KeyEncoder::deployment_key(id))
    }

    fn put_deployment(&self, deployment: &Deployment) -> Result<()> {
        self.put_record(&KeyEncoder::deployment_key(&deployment.id), deployment)
    }

    fn list_deployments(&self) -> Result<Vec<Deployment>> {
        let prefix = KeyEncoder::encode_prefix(KeyEncoder::DEPLOYMENT);
        let mut deployments = Vec::new();
        for (_key, data) in self.scan(prefix.as_bytes())? {
            deployments.push(serde_json::from_slice(&data)?);
        }
        Ok(deployments)
    }

    fn put_cluster_and_deployment(
        &self,
        cluster: &Cluster,
        deployment: &Deployment,
    ) -> Result<()> {
        let cluster_data = serde_json::to_vec(cluster)?;
        let deployment_data = serde_json::to_vec(deployment)?;

        let mut txn = self.transaction()?;
        txn.put(KeyEncoder::cluster_key(&cluster.id).as_bytes(), &cluster_data)?;
        txn.put(
            KeyEncoder::deployment_key(&deployment.id).as_bytes(),
            &deployment_data,
        )?;
        txn.commit()
    }
}

impl QueueBackend for RedbBackend {
    fn push_back(&self, queue: &str, item: &[u8]) -> Result<u64> {
        let head_key = KeyEncoder::queue_head_key(queue);
        let tail_key = KeyEncoder::queue_tail_key(queue);

        let write_txn = self.db.begin_write()?;
        let length = {
            let mut cursors = write_txn.open_table(QUEUE_CURSORS_TABLE)?;
            let mut items = write_txn.open_table(QUEUE_ITEMS_TABLE)?;

            let head = read_cursor(&cursors, &head_key)?;
            let tail = read_cursor(&cursors, &tail_key)?;

            items.insert(KeyEncoder::queue_item_key(queue, tail).as_str(), item)?;
            cursors.insert(tail_key.as_str(), tail + 1)?;

            tail + 1 - head
        };
        write_txn.commit()?;

        debug!(queue, length, "pushed queue item");
        Ok(length)
    }

    fn pop_front(&self, queue: &str) -> Result<Option<Bytes>> {
        let head_key = KeyEncoder::queue_head_key(queue);
        let tail_key = KeyEncoder::queue_tail_key(queue);

        let write_txn = self.db.begin_write()?;
        let item = {
            let mut cursors = write_txn.open_table(QUEUE_CURSORS_TABLE)?;
            let mut items = write_txn.open_table(QUEUE_ITEMS_TABLE)?;

            let head = read_cursor(&cursors, &head_key)?;
            let tail = read_cursor(&cursors, &tail_key)?;

            if head >= tail {
                None
            } else {
                let item = items
                    .remove(KeyEncoder::queue_item_key(queue, head).as_str())?
                    .map(|guard| Bytes::from(guard.value().to_vec()))
                    .ok_or_else(|| StorageError::queue_corrupted(queue, head))?;
                cursors.insert(head_key.as_str(), head + 1)?;
                Some(item)
            }
        };
        write_txn.commit()?;

        Ok(item)
    }

    fn peek_front(&self, queue: &str) -> Result<Option<Bytes>> {
        let read_txn = self.db.begin_read()?;
        let cursors = read_txn.open_table(QUEUE_CURSORS_TABLE)?;
        let items = read_txn.open_table(QUEUE_ITEMS_TABLE)?;

        let head = read_cursor(&cursors, &KeyEncoder::queue_head_key(queue))?;
        let tail = read_cursor(&cursors, &KeyEncoder::queue_tail_key(queue))?;

        if head >= tail {
            return Ok(None);
        }

        let item = items
            .get(KeyEncoder::queue_item_key(queue, head).as_str())?
            .map(|guard| Bytes::from(guard.value().to_vec()))
            .ok_or_else(|| StorageError::queue_corrupted(queue, head))?;
        Ok(Some(item))
    }

    fn length(&self, queue: &str) -> Result<u64> {
        let read_txn = self.db.begin_read()?;
        let cursors = read_txn.open_table(QUEUE_CURSORS_TABLE)?;

        let head = read_cursor(&cursors, &KeyEncoder::queue_head_key(queue))?;
        let tail = read_cursor(&cursors, &KeyEncoder::queue_tail_key(queue))?;
        Ok(tail.saturating_sub(head))
    }
}

/// Write batch over one redb write transaction
struct RedbTransaction {
    txn: Option<redb::WriteTransaction>,
}

impl RedbTransaction {
    fn open(&self) -> Result<&redb::WriteTransaction> {
        self.txn
            .as_ref()
            .ok_or_else(|| StorageError::transaction_error("write batch already committed"))
    }
}

impl KVTransaction for RedbTransaction {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut table = self.open()?.open_table(RESOURCES_TABLE)?;
        table.insert(key, value)?;
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        let txn = self
            .txn
            .take()
            .ok_or_else(|| StorageError::transaction_error("write batch already committed"))?;
        txn.commit()?;
        Ok(())
    }
}

impl Drop for RedbTransaction {
    fn drop(&mut self) {
        if let Some(txn) = self.txn.take() {
            if let Err(e) = txn.abort() {
                debug!("aborting uncommitted write batch failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::{Priority, Resources};
    use tempfile::tempdir;

    #[test]
    fn test_records_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.redb");
        let mut cluster = Cluster::new("edge", Resources::new(8.0, 1.0, 32.0));

        {
            let backend = RedbBackend::new(&db_path).unwrap();
            backend.put_cluster(&cluster).unwrap();
            cluster.utilized = Resources::new(2.0, 0.0, 4.0);
            backend.put_cluster(&cluster).unwrap();
        }

        let backend = RedbBackend::new(&db_path).unwrap();
        assert_eq!(backend.get_cluster(&cluster.id).unwrap(), Some(cluster));
        assert_eq!(backend.list_clusters().unwrap().len(), 1);
    }

    #[test]
    fn test_uncommitted_batch_writes_nothing() {
        let backend = RedbBackend::in_memory().unwrap();
        let cluster = Cluster::new("edge", Resources::new(8.0, 1.0, 32.0));
        let key = KeyEncoder::cluster_key(&cluster.id);

        {
            let mut txn = backend.transaction().unwrap();
            txn.put(key.as_bytes(), &serde_json::to_vec(&cluster).unwrap())
                .unwrap();
            // dropped without commit
        }
        assert_eq!(backend.get_cluster(&cluster.id).unwrap(), None);

        let mut txn = backend.transaction().unwrap();
        txn.put(key.as_bytes(), &serde_json::to_vec(&cluster).unwrap())
            .unwrap();
        txn.commit().unwrap();
        assert_eq!(backend.get_cluster(&cluster.id).unwrap(), Some(cluster));
    }

    #[test]
    fn test_record_store_roundtrip_and_missing() {
        let backend = RedbBackend::in_memory().unwrap();

        let cluster = Cluster::new("edge", Resources::new(8.0, 1.0, 32.0));
        backend.put_cluster(&cluster).unwrap();
        assert_eq!(backend.get_cluster(&cluster.id).unwrap(), Some(cluster.clone()));
        assert_eq!(backend.get_cluster("missing").unwrap(), None);
        assert_eq!(backend.get_deployment("missing").unwrap(), None);

        let other = Cluster::new("core", Resources::new(4.0, 0.0, 8.0));
        backend.put_cluster(&other).unwrap();
        assert_eq!(backend.list_clusters().unwrap().len(), 2);
    }

    #[test]
    fn test_put_cluster_and_deployment_writes_both() {
        let backend = RedbBackend::in_memory().unwrap();

        let mut cluster = Cluster::new("edge", Resources::new(8.0, 1.0, 32.0));
        let mut deployment =
            Deployment::new("web", "nginx:1.27", Resources::new(2.0, 0.0, 4.0), Priority::High);
        cluster.utilized = deployment.required;
        deployment.cluster_id = Some(cluster.id.clone());

        backend.put_cluster_and_deployment(&cluster, &deployment).unwrap();

        assert_eq!(backend.get_cluster(&cluster.id).unwrap().unwrap().utilized.cpu, 2.0);
        assert_eq!(
            backend.get_deployment(&deployment.id).unwrap().unwrap().cluster_id,
            Some(cluster.id)
        );
    }

    #[test]
    fn test_queue_fifo_order() {
        let backend = RedbBackend::in_memory().unwrap();

        assert_eq!(backend.push_back("q", b"a").unwrap(), 1);
        assert_eq!(backend.push_back("q", b"b").unwrap(), 2);
        assert_eq!(backend.push_back("q", b"c").unwrap(), 3);
        assert_eq!(backend.length("q").unwrap(), 3);

        assert_eq!(backend.peek_front("q").unwrap(), Some(Bytes::from("a")));
        assert_eq!(backend.pop_front("q").unwrap(), Some(Bytes::from("a")));
        assert_eq!(backend.pop_front("q").unwrap(), Some(Bytes::from("b")));

        // Re-appending after pops keeps arrival order
        assert_eq!(backend.push_back("q", b"d").unwrap(), 2);
        assert_eq!(backend.pop_front("q").unwrap(), Some(Bytes::from("c")));
        assert_eq!(backend.pop_front("q").unwrap(), Some(Bytes::from("d")));
        assert_eq!(backend.pop_front("q").unwrap(), None);
        assert_eq!(backend.peek_front("q").unwrap(), None);
        assert_eq!(backend.length("q").unwrap(), 0);
    }

    #[test]
    fn test_queues_are_independent() {
        let backend = RedbBackend::in_memory().unwrap();

        backend.push_back("cluster/a/high", b"1").unwrap();
        backend.push_back("cluster/a/low", b"2").unwrap();
        backend.push_back("cluster/a/low", b"3").unwrap();

        assert_eq!(backend.length("cluster/a/high").unwrap(), 1);
        assert_eq!(backend.length("cluster/a/low").unwrap(), 2);
        assert_eq!(backend.length("cluster/b/high").unwrap(), 0);
        assert_eq!(backend.pop_front("cluster/a/low").unwrap(), Some(Bytes::from("2")));
    }

    #[test]
    fn test_queue_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let backend = RedbBackend::new(&db_path).unwrap();
            backend.push_back("q", b"first").unwrap();
            backend.push_back("q", b"second").unwrap();
            backend.pop_front("q").unwrap();
        }

        let backend = RedbBackend::new(&db_path).unwrap();
        assert_eq!(backend.length("q").unwrap(), 1);
        assert_eq!(backend.pop_front("q").unwrap(), Some(Bytes::from("second")));
    }
}

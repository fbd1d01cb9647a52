use super::Selector;
use crate::errors::{classify_kube, ErrorClass};
use async_trait::async_trait;
use k8s_openapi::{
    api::{
        apps::v1::{DaemonSet, Deployment, ReplicaSet},
        core::v1::Pod,
    },
    NamespaceResourceScope,
};
use kube::api::{Api, ListParams};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("resource not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Read-only view of the workload resources in the cluster.
#[async_trait]
pub trait WorkloadReader: Send + Sync {
    async fn get_daemon_set(&self, namespace: &str, name: &str) -> Result<DaemonSet, ReadError>;

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, ReadError>;

    async fn list_replica_sets(
        &self,
        namespace: &str,
        selector: &Selector,
    ) -> Result<Vec<ReplicaSet>, ReadError>;

    async fn list_pods(&self, namespace: &str, selector: &Selector) -> Result<Vec<Pod>, ReadError>;
}

/// [`WorkloadReader`] backed by the API server
#[derive(Clone)]
pub struct KubeWorkloadReader {
    client: kube::Client,
}

impl KubeWorkloadReader {
    pub fn new(client: kube::Client) -> Self {
        KubeWorkloadReader { client }
    }

    async fn get<K>(&self, namespace: &str, name: &str) -> Result<K, ReadError>
    where
        K: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        let api = Api::<K>::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|err| read_error(err, format!("failed to get {}", K::kind(&()))))
    }

    async fn list<K>(&self, namespace: &str, selector: &Selector) -> Result<Vec<K>, ReadError>
    where
        K: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        let api = Api::<K>::namespaced(self.client.clone(), namespace);
        let params = ListParams::default().labels(&selector.to_string());
        let list = api
            .list(&params)
            .await
            .map_err(|err| {
                read_error(
                    err,
                    format!("failed to list {} matching '{}'", K::plural(&()), selector),
                )
            })?;
        Ok(list.items)
    }
}

/// Wraps an API error, pointing out missing permissions and timeouts
fn read_error(err: kube::Error, action: String) -> ReadError {
    let context = match classify_kube(&err) {
        ErrorClass::NotFound => return ReadError::NotFound,
        ErrorClass::Forbidden => format!("{}: access denied, check the RBAC permissions", action),
        ErrorClass::Timeout => format!("{}: API server timed out", action),
        _ => action,
    };
    ReadError::Other(anyhow::Error::new(err).context(context))
}

#[async_trait]
impl WorkloadReader for KubeWorkloadReader {
    async fn get_daemon_set(&self, namespace: &str, name: &str) -> Result<DaemonSet, ReadError> {
        self.get(namespace, name).await
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, ReadError> {
        self.get(namespace, name).await
    }

    async fn list_replica_sets(
        &self,
        namespace: &str,
        selector: &Selector,
    ) -> Result<Vec<ReplicaSet>, ReadError> {
        self.list(namespace, selector).await
    }

    async fn list_pods(&self, namespace: &str, selector: &Selector) -> Result<Vec<Pod>, ReadError> {
        self.list(namespace, selector).await
    }
}

//! The aggregation key: the dimensions that decide which documents roll up together.

use std::borrow::Cow;

use jiff::Timestamp;

use crate::document::{DurationHistogram, MetricDoc, Transaction};

/// Grouping identity of a transaction metric document.
///
/// Two documents roll up into the same bucket iff every field is equal. The
/// key never carries a timestamp or histogram data.
///
/// Keys borrow from the document they were extracted from while probing the
/// bucket map; [`AggregationKey::into_owned`] produces the `'static` key that
/// is stored once a new bucket is created.
///
/// The `faas_*` and `cloud_service_name` dimensions are reserved: they are
/// part of the key's identity but are never populated from documents yet, so
/// they are always empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub struct AggregationKey<'a> {
    pub faas_coldstart: Option<bool>,
    pub faas_id: Cow<'a, str>,
    pub faas_name: Cow<'a, str>,
    pub faas_version: Cow<'a, str>,
    pub faas_trigger_type: Cow<'a, str>,
    pub cloud_service_name: Cow<'a, str>,

    pub agent_name: Cow<'a, str>,
    pub host_os_platform: Cow<'a, str>,
    pub host_hostname: Cow<'a, str>,
    pub host_name: Cow<'a, str>,
    pub kubernetes_pod_name: Cow<'a, str>,
    pub container_id: Cow<'a, str>,
    pub cloud_provider: Cow<'a, str>,
    pub cloud_region: Cow<'a, str>,
    pub cloud_availability_zone: Cow<'a, str>,
    pub cloud_account_id: Cow<'a, str>,
    pub cloud_account_name: Cow<'a, str>,
    pub cloud_machine_type: Cow<'a, str>,
    pub cloud_project_id: Cow<'a, str>,
    pub cloud_project_name: Cow<'a, str>,
    pub service_environment: Cow<'a, str>,
    pub service_name: Cow<'a, str>,
    pub service_version: Cow<'a, str>,
    pub service_node_name: Cow<'a, str>,
    pub service_runtime_name: Cow<'a, str>,
    pub service_runtime_version: Cow<'a, str>,
    pub service_language_name: Cow<'a, str>,
    pub service_language_version: Cow<'a, str>,
    pub transaction_name: Cow<'a, str>,
    pub transaction_result: Cow<'a, str>,
    pub transaction_type: Cow<'a, str>,
    pub event_outcome: Cow<'a, str>,
    pub trace_root: bool,
}

/// An aggregation key that owns its data.
pub type OwnedAggregationKey = AggregationKey<'static>;

fn owned(value: &Cow<'_, str>) -> Cow<'static, str> {
    Cow::Owned(value.clone().into_owned())
}

impl<'a> AggregationKey<'a> {
    /// Extracts the key from a document. Missing fields are empty.
    pub fn from_doc(doc: &'a MetricDoc) -> Self {
        let b = |value: &'a String| Cow::Borrowed(value.as_str());
        Self {
            faas_coldstart: None,
            faas_id: Cow::Borrowed(""),
            faas_name: Cow::Borrowed(""),
            faas_version: Cow::Borrowed(""),
            faas_trigger_type: Cow::Borrowed(""),
            cloud_service_name: Cow::Borrowed(""),

            agent_name: b(&doc.agent.name),
            host_os_platform: b(&doc.host.os.platform),
            host_hostname: b(&doc.host.hostname),
            host_name: b(&doc.host.name),
            kubernetes_pod_name: b(&doc.kubernetes.pod.name),
            container_id: b(&doc.container.id),
            cloud_provider: b(&doc.cloud.provider),
            cloud_region: b(&doc.cloud.region),
            cloud_availability_zone: b(&doc.cloud.availability_zone),
            cloud_account_id: b(&doc.cloud.account.id),
            cloud_account_name: b(&doc.cloud.account.name),
            cloud_machine_type: b(&doc.cloud.machine.machine_type),
            cloud_project_id: b(&doc.cloud.project.id),
            cloud_project_name: b(&doc.cloud.project.name),
            service_environment: b(&doc.service.environment),
            service_name: b(&doc.service.name),
            service_version: b(&doc.service.version),
            service_node_name: b(&doc.service.node.name),
            service_runtime_name: b(&doc.service.runtime.name),
            service_runtime_version: b(&doc.service.runtime.version),
            service_language_name: b(&doc.service.language.name),
            service_language_version: b(&doc.service.language.version),
            transaction_name: b(&doc.transaction.name),
            transaction_result: b(&doc.transaction.result),
            transaction_type: b(&doc.transaction.transaction_type),
            event_outcome: b(&doc.event.outcome),
            trace_root: doc.transaction.root,
        }
    }

    /// Copies every borrowed field, detaching the key from its document.
    pub fn into_owned(&self) -> OwnedAggregationKey {
        AggregationKey {
            faas_coldstart: self.faas_coldstart,
            faas_id: owned(&self.faas_id),
            faas_name: owned(&self.faas_name),
            faas_version: owned(&self.faas_version),
            faas_trigger_type: owned(&self.faas_trigger_type),
            cloud_service_name: owned(&self.cloud_service_name),

            agent_name: owned(&self.agent_name),
            host_os_platform: owned(&self.host_os_platform),
            host_hostname: owned(&self.host_hostname),
            host_name: owned(&self.host_name),
            kubernetes_pod_name: owned(&self.kubernetes_pod_name),
            container_id: owned(&self.container_id),
            cloud_provider: owned(&self.cloud_provider),
            cloud_region: owned(&self.cloud_region),
            cloud_availability_zone: owned(&self.cloud_availability_zone),
            cloud_account_id: owned(&self.cloud_account_id),
            cloud_account_name: owned(&self.cloud_account_name),
            cloud_machine_type: owned(&self.cloud_machine_type),
            cloud_project_id: owned(&self.cloud_project_id),
            cloud_project_name: owned(&self.cloud_project_name),
            service_environment: owned(&self.service_environment),
            service_name: owned(&self.service_name),
            service_version: owned(&self.service_version),
            service_node_name: owned(&self.service_node_name),
            service_runtime_name: owned(&self.service_runtime_name),
            service_runtime_version: owned(&self.service_runtime_version),
            service_language_name: owned(&self.service_language_name),
            service_language_version: owned(&self.service_language_version),
            transaction_name: owned(&self.transaction_name),
            transaction_result: owned(&self.transaction_result),
            transaction_type: owned(&self.transaction_type),
            event_outcome: owned(&self.event_outcome),
            trace_root: self.trace_root,
        }
    }

    /// Rebuilds a document from the key, the inverse of [`AggregationKey::from_doc`].
    pub fn to_doc(&self, timestamp: Timestamp, histogram: DurationHistogram) -> MetricDoc {
        let mut doc = MetricDoc {
            timestamp,
            ..MetricDoc::default()
        };

        doc.agent.name = self.agent_name.to_string();
        doc.cloud.provider = self.cloud_provider.to_string();
        doc.cloud.region = self.cloud_region.to_string();
        doc.cloud.availability_zone = self.cloud_availability_zone.to_string();
        doc.cloud.account.id = self.cloud_account_id.to_string();
        doc.cloud.account.name = self.cloud_account_name.to_string();
        doc.cloud.machine.machine_type = self.cloud_machine_type.to_string();
        doc.cloud.project.id = self.cloud_project_id.to_string();
        doc.cloud.project.name = self.cloud_project_name.to_string();
        doc.container.id = self.container_id.to_string();
        doc.kubernetes.pod.name = self.kubernetes_pod_name.to_string();
        doc.service.environment = self.service_environment.to_string();
        doc.service.name = self.service_name.to_string();
        doc.service.version = self.service_version.to_string();
        doc.service.node.name = self.service_node_name.to_string();
        doc.service.runtime.name = self.service_runtime_name.to_string();
        doc.service.runtime.version = self.service_runtime_version.to_string();
        doc.service.language.name = self.service_language_name.to_string();
        doc.service.language.version = self.service_language_version.to_string();
        doc.event.outcome = self.event_outcome.to_string();
        doc.host.name = self.host_name.to_string();
        doc.host.hostname = self.host_hostname.to_string();
        doc.host.os.platform = self.host_os_platform.to_string();
        doc.transaction = Transaction {
            name: self.transaction_name.to_string(),
            root: self.trace_root,
            result: self.transaction_result.to_string(),
            transaction_type: self.transaction_type.to_string(),
            duration_histogram: histogram,
        };

        doc
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use assert2::check;

    use super::AggregationKey;
    use crate::document::{DurationHistogram, MetricDoc};

    fn sample_doc() -> MetricDoc {
        let mut doc = MetricDoc::default();
        doc.agent.name = "go".into();
        doc.host.name = "web-1".into();
        doc.host.hostname = "web-1.internal".into();
        doc.host.os.platform = "linux".into();
        doc.cloud.provider = "aws".into();
        doc.cloud.machine.machine_type = "m5.large".into();
        doc.service.name = "checkout".into();
        doc.service.runtime.version = "1.21".into();
        doc.transaction.name = "GET /cart".into();
        doc.transaction.transaction_type = "request".into();
        doc.transaction.root = true;
        doc.event.outcome = "success".into();
        doc
    }

    #[test]
    fn extraction_borrows_from_document() {
        let doc = sample_doc();
        let key = AggregationKey::from_doc(&doc);
        check!(matches!(key.service_name, Cow::Borrowed("checkout")));
        check!(key.host_name == "web-1");
        check!(key.host_hostname == "web-1.internal");
        check!(key.trace_root);
        check!(key.faas_coldstart.is_none());
        check!(key.cloud_service_name.is_empty());
    }

    #[test]
    fn owned_key_equals_borrowed_key() {
        let doc = sample_doc();
        let borrowed = AggregationKey::from_doc(&doc);
        let owned = borrowed.into_owned();
        check!(matches!(owned.service_name, Cow::Owned(_)));
        check!(owned == borrowed);
    }

    #[test]
    fn to_doc_is_inverse_of_from_doc() {
        let doc = sample_doc();
        let key = AggregationKey::from_doc(&doc);
        let rebuilt = key.to_doc(doc.timestamp, DurationHistogram::default());
        check!(rebuilt == doc);
        check!(AggregationKey::from_doc(&rebuilt) == key);
    }

    #[test]
    fn missing_fields_default() {
        let doc = MetricDoc::default();
        let key = AggregationKey::from_doc(&doc);
        check!(key == AggregationKey::default());
    }
}

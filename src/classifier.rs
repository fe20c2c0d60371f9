use crate::data_models::MarkerElement;

#[derive(Debug, Clone)]
pub struct Partition<E> {
    pub individuals: Vec<MarkerElement<E>>,
    pub clusters: Vec<MarkerElement<E>>,
}

impl<E> Partition<E> {
    pub fn len(&self) -> usize {
        self.individuals.len() + self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn is_cluster(class_name: Option<&str>, cluster_class: &str) -> bool {
    match class_name {
        Some(class_name) if !cluster_class.is_empty() => class_name.contains(cluster_class),
        _ => false,
    }
}

/// Splits markers into individual pins and cluster pins, keeping input order
/// within each side. Markers without a class attribute count as individuals.
pub fn classify<E>(markers: Vec<MarkerElement<E>>, cluster_class: &str) -> Partition<E> {
    let (clusters, individuals) = markers
        .into_iter()
        .partition(|m| is_cluster(m.class_name.as_deref(), cluster_class));

    Partition {
        individuals,
        clusters,
    }
}

use std::collections::HashMap;

use crate::limits::*;
use crate::model::Resource;

/// Read-only resource catalog. Built once at startup and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(resources: Vec<Resource>) -> Result<Self, CatalogError> {
        if resources.len() > MAX_CATALOG_SIZE {
            return Err(CatalogError::TooLarge(resources.len()));
        }
        let mut index = HashMap::with_capacity(resources.len());
        for (pos, r) in resources.iter().enumerate() {
            if r.id.is_empty() || r.id.len() > MAX_RESOURCE_ID_LEN {
                return Err(CatalogError::InvalidId(r.id.clone()));
            }
            if r.kind.len() > MAX_RESOURCE_KIND_LEN {
                return Err(CatalogError::InvalidKind(r.id.clone()));
            }
            if r.capacity == 0 {
                return Err(CatalogError::ZeroCapacity(r.id.clone()));
            }
            if index.insert(r.id.clone(), pos).is_some() {
                return Err(CatalogError::Duplicate(r.id.clone()));
            }
        }
        Ok(Self { resources, index })
    }

    /// The three campus resources every deployment starts with.
    pub fn seed() -> Self {
        let resources = vec![
            Resource::new("R101", "Classroom", 60),
            Resource::new("L201", "Lab", 40),
            Resource::new("A301", "Auditorium", 200),
        ];
        let index = resources
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.id.clone(), pos))
            .collect();
        Self { resources, index }
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.index.get(id).map(|&pos| &self.resources[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    InvalidId(String),
    InvalidKind(String),
    ZeroCapacity(String),
    Duplicate(String),
    TooLarge(usize),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::InvalidId(id) => write!(f, "invalid resource id: {id:?}"),
            CatalogError::InvalidKind(id) => write!(f, "resource type too long for {id}"),
            CatalogError::ZeroCapacity(id) => write!(f, "resource {id} must have positive capacity"),
            CatalogError::Duplicate(id) => write!(f, "duplicate resource id: {id}"),
            CatalogError::TooLarge(n) => {
                write!(f, "catalog has {n} resources, limit is {MAX_CATALOG_SIZE}")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_has_campus_resources_in_order() {
        let catalog = Catalog::seed();
        let ids: Vec<&str> = catalog.resources().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["R101", "L201", "A301"]);
        assert_eq!(catalog.get("L201").unwrap().kind, "Lab");
        assert_eq!(catalog.get("A301").unwrap().capacity, 200);
        assert!(catalog.contains("R101"));
        assert!(!catalog.contains("Z999"));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let result = Catalog::new(vec![
            Resource::new("R101", "Classroom", 60),
            Resource::new("R101", "Lab", 40),
        ]);
        assert_eq!(result.unwrap_err(), CatalogError::Duplicate("R101".into()));
    }

    #[test]
    fn zero_capacity_rejected() {
        let result = Catalog::new(vec![Resource::new("R101", "Classroom", 0)]);
        assert!(matches!(result, Err(CatalogError::ZeroCapacity(_))));
    }

    #[test]
    fn empty_id_rejected() {
        let result = Catalog::new(vec![Resource::new("", "Classroom", 10)]);
        assert!(matches!(result, Err(CatalogError::InvalidId(_))));
    }

    #[test]
    fn empty_catalog_is_valid() {
        let catalog = Catalog::new(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog.len(), 0);
    }
}

use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationshipId(pub(crate) usize);

pub type Relationship = Zipper<RelationshipId>;

/// The storage shape of a relationship. The indexes are always expressed from the point of view of
/// the owning collection ("parent") towards the related collection ("child").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationKind {
    /// The owning row holds `foreign_key`, pointing at the related collection's primary index.
    ManyToOne { foreign_key: Index, referenced: Index },

    /// Related rows hold `foreign_key`, pointing at the owning collection's primary index.
    OneToMany { referenced: Index, foreign_key: Index },

    /// Pairs are stored as rows of a link table.
    ManyToMany { link: LinkTable },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkTable {
    pub table: String,
    /// Columns referencing the owning collection's primary index, in index order.
    pub parent_columns: Vec<String>,
    /// Columns referencing the related collection's primary index, in index order.
    pub child_columns: Vec<String>,
}

impl Relationship {
    fn data(&self) -> &crate::internal_schema::RelationshipData {
        self.schema.relationship_data(self.id)
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// The collection declaring the relationship.
    pub fn collection(&self) -> Collection {
        self.schema.clone().zip(self.data().collection)
    }

    pub fn related(&self) -> Collection {
        self.schema.clone().zip(self.data().related)
    }

    pub fn kind(&self) -> &RelationKind {
        &self.data().kind
    }

    pub fn inverse(&self) -> Option<Relationship> {
        self.data().inverse.map(|id| self.schema.clone().zip(id))
    }

    pub fn is_many_to_one(&self) -> bool {
        matches!(self.kind(), RelationKind::ManyToOne { .. })
    }

    pub fn is_to_many(&self) -> bool {
        !self.is_many_to_one()
    }

    /// Builds the link-table row for a (parent, child) pair of primary key records.
    pub fn link_record(&self, parent: &Record, child: &Record) -> Option<Record> {
        let RelationKind::ManyToMany { link } = self.kind() else {
            return None;
        };

        let parent_values = self.collection().primary_index().values_of(parent)?;
        let child_values = self.related().primary_index().values_of(child)?;

        let record = link
            .parent_columns
            .iter()
            .cloned()
            .zip(parent_values)
            .chain(link.child_columns.iter().cloned().zip(child_values))
            .collect();

        Some(record)
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.collection().name(), self.name())
    }
}

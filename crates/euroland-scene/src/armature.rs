// euroland-scene/src/armature.rs
//! Armature and bone structures

use euroland_core::{Error, Mat4, Result};
use serde::{Deserialize, Serialize};

/// Armature datablock (rest pose skeleton)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Armature {
    /// Armature name
    pub name: String,
    /// All bones in the armature
    #[serde(default)]
    pub bones: Vec<Bone>,
}

impl Armature {
    /// Create a new empty armature
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bones: Vec::new(),
        }
    }

    /// Add a bone to the armature
    pub fn add_bone(&mut self, bone: Bone) -> usize {
        let idx = self.bones.len();
        self.bones.push(bone);
        idx
    }

    /// Get bone count
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Find bone by name
    pub fn find_bone(&self, name: &str) -> Option<&Bone> {
        self.bones.iter().find(|b| b.name == name)
    }

    /// Find bone index by name
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Parent bone index
    pub fn parent_index(&self, bone_index: usize) -> Option<usize> {
        self.bones
            .get(bone_index)
            .and_then(|b| b.parent.as_deref())
            .and_then(|parent| self.bone_index(parent))
    }

    /// Get children of a bone
    pub fn children(&self, bone_index: usize) -> Vec<usize> {
        (0..self.bones.len())
            .filter(|&i| self.parent_index(i) == Some(bone_index))
            .collect()
    }

    /// Root bone indices
    pub fn roots(&self) -> Vec<usize> {
        (0..self.bones.len())
            .filter(|&i| self.parent_index(i).is_none())
            .collect()
    }

    /// Get bone chain from a bone to root
    pub fn bone_chain_to_root(&self, bone_index: usize) -> Vec<usize> {
        let mut chain = vec![bone_index];
        let mut current = bone_index;

        while let Some(parent) = self.parent_index(current) {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }

        chain
    }

    /// Bone indices with every parent ahead of its children
    pub fn ordered_bones(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.bones.len());
        let mut stack: Vec<usize> = self.roots().into_iter().rev().collect();

        while let Some(idx) = stack.pop() {
            if order.contains(&idx) {
                continue;
            }
            order.push(idx);
            stack.extend(self.children(idx).into_iter().rev());
        }

        order
    }

    /// Rest transform relative to the parent bone (armature space for roots)
    pub fn parent_relative(&self, bone_index: usize) -> Option<Mat4> {
        let bone = self.bones.get(bone_index)?;
        match self.parent_index(bone_index) {
            Some(parent) => {
                let inverse = self.bones[parent].matrix_local.inverse_affine()?;
                Some(inverse.mul(&bone.matrix_local))
            }
            None => Some(bone.matrix_local),
        }
    }

    /// Get all bone names
    pub fn bone_names(&self) -> Vec<&str> {
        self.bones.iter().map(|b| b.name.as_str()).collect()
    }

    /// Validate armature structure
    pub fn validate(&self) -> Result<()> {
        for (idx, bone) in self.bones.iter().enumerate() {
            if self.bones[..idx].iter().any(|b| b.name == bone.name) {
                return Err(Error::duplicate_name("bone", &bone.name));
            }
            if !bone.matrix_local.is_finite() {
                return Err(Error::invalid_data(format!(
                    "armature '{}': bone '{}' has a non-finite rest matrix",
                    self.name, bone.name
                )));
            }
            if let Some(parent) = &bone.parent {
                if parent == &bone.name {
                    return Err(Error::cyclic("bone", &bone.name));
                }
                if self.bone_index(parent).is_none() {
                    return Err(Error::missing_reference("bone", parent));
                }
            }
        }

        for idx in 0..self.bones.len() {
            let mut current = idx;
            let mut steps = 0;
            while let Some(parent) = self.parent_index(current) {
                steps += 1;
                if steps > self.bones.len() {
                    return Err(Error::cyclic("bone", &self.bones[idx].name));
                }
                current = parent;
            }
        }

        Ok(())
    }
}

/// A single bone in rest pose
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bone {
    /// Bone name
    pub name: String,
    /// Parent bone name (None for root bones)
    #[serde(default)]
    pub parent: Option<String>,
    /// Rest matrix in armature space
    #[serde(default)]
    pub matrix_local: Mat4,
    /// Head to tail length
    #[serde(default)]
    pub length: f32,
}

impl Bone {
    /// Create a new bone
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            matrix_local: Mat4::IDENTITY,
            length: 1.0,
        }
    }

    /// Builder-style parent assignment
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Builder-style rest matrix assignment
    pub fn with_matrix(mut self, matrix_local: Mat4) -> Self {
        self.matrix_local = matrix_local;
        self
    }

    /// Check if this is a root bone
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euroland_core::Vec3;

    fn make_chain() -> Armature {
        let mut armature = Armature::new("Rig");
        armature.add_bone(Bone::new("root"));
        armature.add_bone(
            Bone::new("child")
                .with_parent("root")
                .with_matrix(Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))),
        );
        armature.add_bone(
            Bone::new("grandchild")
                .with_parent("child")
                .with_matrix(Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0))),
        );
        armature
    }

    #[test]
    fn test_armature_add_bone() {
        let armature = make_chain();

        assert_eq!(armature.bone_count(), 3);
        assert_eq!(armature.roots(), vec![0]);
        assert_eq!(armature.children(0), vec![1]);
    }

    #[test]
    fn test_armature_find_bone() {
        let armature = make_chain();

        assert!(armature.find_bone("child").is_some());
        assert!(armature.find_bone("nonexistent").is_none());
    }

    #[test]
    fn test_bone_chain_to_root() {
        let armature = make_chain();
        assert_eq!(armature.bone_chain_to_root(2), vec![2, 1, 0]);
    }

    #[test]
    fn test_ordered_bones_parents_first() {
        let mut armature = Armature::new("Rig");
        armature.add_bone(Bone::new("hand").with_parent("arm"));
        armature.add_bone(Bone::new("arm"));

        assert_eq!(armature.ordered_bones(), vec![1, 0]);
    }

    #[test]
    fn test_parent_relative() {
        let armature = make_chain();
        let local = armature.parent_relative(2).unwrap();
        assert!(local.translation().approx_eq(&Vec3::new(0.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn test_validate_cycle() {
        let mut armature = Armature::new("Rig");
        armature.add_bone(Bone::new("a").with_parent("b"));
        armature.add_bone(Bone::new("b").with_parent("a"));
        assert!(armature.validate().is_err());
    }

    #[test]
    fn test_validate_missing_parent() {
        let mut armature = Armature::new("Rig");
        armature.add_bone(Bone::new("a").with_parent("ghost"));
        assert!(armature.validate().unwrap_err().is_not_found());
    }
}

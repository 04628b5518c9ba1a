//! Algorithms: compute shaders bound to tensors, a dispatch size and constants.
//!
//! Pipeline layout and descriptor binding happen when an algorithm is recorded into a
//! sequence; creation validates the inputs, resolves the workgroup and loads the shader
//! module.

use std::fmt;
use std::sync::Arc;

use vkore_driver::ShaderModuleHandle;

use crate::arena::{GpuResources, ManagedResource, ResourceKind, SharedArena, SlotKey, SlotLease};
use crate::constants::Constants;
use crate::context::DeviceContext;
use crate::tensor::Tensor;
use crate::{Result, VkoreError};

/// 3-dimensional dispatch size. `x == 0` means "unset".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Workgroup {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Workgroup {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub fn is_unset(&self) -> bool {
        self.x == 0
    }

    pub fn as_array(&self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[u32; 3]> for Workgroup {
    fn from([x, y, z]: [u32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Inputs for [`Manager::algorithm`](crate::Manager::algorithm).
///
/// Every field is optional. Constants default to empty `f32` lists.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmDesc {
    pub tensors: Vec<Tensor>,
    pub spirv: Vec<u32>,
    pub workgroup: Workgroup,
    pub specialization_constants: Constants,
    pub push_constants: Constants,
}

impl AlgorithmDesc {
    pub fn new(tensors: Vec<Tensor>) -> Self {
        Self {
            tensors,
            ..Self::default()
        }
    }

    pub fn with_spirv(mut self, spirv: impl Into<Vec<u32>>) -> Self {
        self.spirv = spirv.into();
        self
    }

    pub fn with_workgroup(mut self, workgroup: impl Into<Workgroup>) -> Self {
        self.workgroup = workgroup.into();
        self
    }

    pub fn with_specialization_constants(mut self, constants: impl Into<Constants>) -> Self {
        self.specialization_constants = constants.into();
        self
    }

    pub fn with_push_constants(mut self, constants: impl Into<Constants>) -> Self {
        self.push_constants = constants.into();
        self
    }
}

/// Shared handle to an algorithm. Holds its tensors alive.
#[derive(Clone)]
pub struct Algorithm {
    inner: Arc<AlgorithmInner>,
}

struct AlgorithmInner {
    lease: SlotLease,
    tensors: Vec<Tensor>,
    workgroup: Workgroup,
    specialization_constants: Constants,
    push_constants: Constants,
    shader_module: Option<ShaderModuleHandle>,
}

impl fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Algorithm")
            .field("key", &self.inner.lease.key())
            .field("tensors", &self.inner.tensors.len())
            .field("workgroup", &self.inner.workgroup)
            .field("shader_module", &self.inner.shader_module)
            .finish()
    }
}

/// Resolve the dispatch size: a workgroup with `x == 0` becomes `(tensors[0].size(), 1, 1)`,
/// whatever its `y` and `z`. An explicit `x` needs non-zero `y` and `z`.
pub fn resolve_workgroup(workgroup: Workgroup, tensors: &[Tensor]) -> Result<Workgroup> {
    if workgroup.is_unset() {
        return Ok(match tensors.first() {
            Some(first) => Workgroup::new(first.size(), 1, 1),
            None => Workgroup::default(),
        });
    }
    if workgroup.x == 0 || workgroup.y == 0 || workgroup.z == 0 {
        return Err(VkoreError::InvalidWorkgroup(workgroup.as_array()));
    }
    Ok(workgroup)
}

impl Algorithm {
    pub(crate) fn create(
        context: &Arc<DeviceContext>,
        arena: &SharedArena,
        desc: AlgorithmDesc,
    ) -> Result<Algorithm> {
        for tensor in &desc.tensors {
            if !tensor.belongs_to(arena) {
                return Err(VkoreError::ForeignResource {
                    kind: ResourceKind::Tensor,
                });
            }
            if !tensor.is_init() {
                return Err(VkoreError::ResourceDestroyed {
                    kind: ResourceKind::Tensor,
                });
            }
        }
        let workgroup = resolve_workgroup(desc.workgroup, &desc.tensors)?;

        // Without both tensors and shader code the algorithm stays uninitialized: it is
        // tracked, but owns no GPU objects until rebuilt with full inputs.
        let mut resources = GpuResources::new(Arc::clone(context));
        let shader_module = if !desc.tensors.is_empty() && !desc.spirv.is_empty() {
            Some(resources.create_shader_module(&desc.spirv)?)
        } else {
            None
        };
        tracing::debug!(
            "vkore: algorithm with {} tensors, workgroup {:?}, {} spec / {} push constants",
            desc.tensors.len(),
            workgroup.as_array(),
            desc.specialization_constants.len(),
            desc.push_constants.len()
        );

        let key = arena.lock().insert(ResourceKind::Algorithm, resources);
        Ok(Algorithm {
            inner: Arc::new(AlgorithmInner {
                lease: SlotLease::new(Arc::clone(arena), key),
                tensors: desc.tensors,
                workgroup,
                specialization_constants: desc.specialization_constants,
                push_constants: desc.push_constants,
                shader_module,
            }),
        })
    }

    pub fn tensors(&self) -> &[Tensor] {
        &self.inner.tensors
    }

    pub fn workgroup(&self) -> Workgroup {
        self.inner.workgroup
    }

    pub fn specialization_constants(&self) -> &Constants {
        &self.inner.specialization_constants
    }

    pub fn push_constants(&self) -> &Constants {
        &self.inner.push_constants
    }

    /// Loaded shader module, if the algorithm was created with tensors and SPIR-V.
    pub fn shader_module(&self) -> Option<ShaderModuleHandle> {
        self.inner.shader_module
    }
}

impl ManagedResource for Algorithm {
    const KIND: ResourceKind = ResourceKind::Algorithm;

    fn key(&self) -> SlotKey {
        self.inner.lease.key()
    }

    /// Live and built with a shader module.
    fn is_init(&self) -> bool {
        self.inner.shader_module.is_some() && self.inner.lease.is_live()
    }

    fn destroy(&self) {
        if self.inner.lease.release() {
            tracing::debug!("vkore: algorithm {:?} destroyed explicitly", self.key());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_unset() {
        assert!(Workgroup::default().is_unset());
        assert!(Workgroup::new(0, 4, 1).is_unset());
        assert!(!Workgroup::new(1, 0, 0).is_unset());
        assert_eq!(Workgroup::from([4, 2, 1]).as_array(), [4, 2, 1]);
    }

    #[test]
    fn test_unset_without_tensors_stays_unset() {
        assert_eq!(
            resolve_workgroup(Workgroup::default(), &[]).unwrap(),
            Workgroup::default()
        );
        assert_eq!(
            resolve_workgroup(Workgroup::new(0, 4, 1), &[]).unwrap(),
            Workgroup::default()
        );
    }

    #[test]
    fn test_explicit_workgroup_kept() {
        assert_eq!(
            resolve_workgroup(Workgroup::new(8, 4, 2), &[]).unwrap(),
            Workgroup::new(8, 4, 2)
        );
    }

    #[test]
    fn test_partial_zero_workgroup_rejected() {
        let err = resolve_workgroup(Workgroup::new(8, 0, 1), &[]).unwrap_err();
        assert!(matches!(err, VkoreError::InvalidWorkgroup([8, 0, 1])));
    }
}

/// Symbolic slot of the shader-visible heap.
///
/// Each role owns exactly one slot, assigned by declaration order. Adding a
/// resource means adding a variant here.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum DescriptorRole {
    SceneConstants,
    PostMap0Srv,
    PostMap0Uav,
    PostMap1Srv,
    PostMap1Uav,
    TileOffsetsSrv,
    MeshVertexUav,
    MeshVertexSrv,
    MeshBaseSrv,
    RayOutputUav,
    RayOutputSrv,
    ShaderTables,
}

impl DescriptorRole {
    pub const COUNT: usize = 12;

    pub const ALL: [DescriptorRole; Self::COUNT] = [
        DescriptorRole::SceneConstants,
        DescriptorRole::PostMap0Srv,
        DescriptorRole::PostMap0Uav,
        DescriptorRole::PostMap1Srv,
        DescriptorRole::PostMap1Uav,
        DescriptorRole::TileOffsetsSrv,
        DescriptorRole::MeshVertexUav,
        DescriptorRole::MeshVertexSrv,
        DescriptorRole::MeshBaseSrv,
        DescriptorRole::RayOutputUav,
        DescriptorRole::RayOutputSrv,
        DescriptorRole::ShaderTables,
    ];

    /// Slot index inside the heap.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            DescriptorRole::SceneConstants => "scene constants",
            DescriptorRole::PostMap0Srv => "post map 0 srv",
            DescriptorRole::PostMap0Uav => "post map 0 uav",
            DescriptorRole::PostMap1Srv => "post map 1 srv",
            DescriptorRole::PostMap1Uav => "post map 1 uav",
            DescriptorRole::TileOffsetsSrv => "tile offsets srv",
            DescriptorRole::MeshVertexUav => "mesh vertex uav",
            DescriptorRole::MeshVertexSrv => "mesh vertex srv",
            DescriptorRole::MeshBaseSrv => "mesh base srv",
            DescriptorRole::RayOutputUav => "ray output uav",
            DescriptorRole::RayOutputSrv => "ray output srv",
            DescriptorRole::ShaderTables => "shader tables",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_declaration_order() {
        for (i, role) in DescriptorRole::ALL.iter().enumerate() {
            assert_eq!(role.index(), i);
        }
    }
}

//! WGSL sources.

/// Lit, instanced mesh shader.
///
/// Shading is Blinn-Phong from an ambient term, one spot light, and up to
/// [`MAX_POINT_LIGHTS`](super::MAX_POINT_LIGHTS) point lights with a smooth
/// range cutoff. Instances with `material.y > 0` are glass: mostly
/// see-through with a fresnel rim whose colour fringes by the chromatic
/// aberration amount.
pub const MESH_SHADER: &str = r#"
struct PointLight {
    position_range: vec4<f32>,
    color_intensity: vec4<f32>,
};

struct Globals {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
    ambient: vec4<f32>,
    spot_position: vec4<f32>,
    spot_direction: vec4<f32>,
    spot_cone: vec4<f32>,
    light_count: vec4<u32>,
    lights: array<PointLight, 8>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
    @location(7) material: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
    @location(3) material: vec4<f32>,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(instance.model_0, instance.model_1, instance.model_2, instance.model_3);
    let world = model * vec4<f32>(vertex.position, 1.0);

    // Inverse-transpose for rotation * scale matrices.
    let scale_sq = vec3<f32>(
        dot(instance.model_0.xyz, instance.model_0.xyz),
        dot(instance.model_1.xyz, instance.model_1.xyz),
        dot(instance.model_2.xyz, instance.model_2.xyz),
    );
    let basis = mat3x3<f32>(instance.model_0.xyz, instance.model_1.xyz, instance.model_2.xyz);

    var out: VertexOutput;
    out.clip_position = globals.view_proj * world;
    out.world_position = world.xyz;
    out.normal = basis * (vertex.normal / scale_sq);
    out.color = instance.color;
    out.material = instance.material;
    return out;
}

fn blinn_phong(n: vec3<f32>, v: vec3<f32>, l: vec3<f32>, albedo: vec3<f32>, roughness: f32) -> vec3<f32> {
    let n_dot_l = max(dot(n, l), 0.0);
    let h = normalize(l + v);
    let shininess = mix(256.0, 4.0, roughness);
    let specular = pow(max(dot(n, h), 0.0), shininess) * (1.0 - roughness) * n_dot_l;
    return albedo * n_dot_l + vec3<f32>(specular);
}

@fragment
fn fs_main(frag: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(frag.normal);
    let v = normalize(globals.camera_position.xyz - frag.world_position);
    let albedo = frag.color.rgb;
    let roughness = frag.material.x;

    var lit = globals.ambient.rgb * albedo;

    let to_spot = globals.spot_position.xyz - frag.world_position;
    let spot_l = normalize(to_spot);
    let cone = smoothstep(globals.spot_cone.y, globals.spot_cone.x, dot(-spot_l, globals.spot_direction.xyz));
    lit += blinn_phong(n, v, spot_l, albedo, roughness) * globals.spot_position.w * cone;

    for (var i = 0u; i < globals.light_count.x; i = i + 1u) {
        let light = globals.lights[i];
        let offset = light.position_range.xyz - frag.world_position;
        let dist = length(offset);
        let falloff = clamp(1.0 - dist / light.position_range.w, 0.0, 1.0);
        let radiance = light.color_intensity.rgb * light.color_intensity.w * falloff * falloff;
        lit += blinn_phong(n, v, offset / max(dist, 0.0001), albedo, roughness) * radiance;
    }

    var alpha = frag.color.a;
    let transmission = frag.material.y;
    if transmission > 0.0 {
        let fresnel = pow(1.0 - max(dot(n, v), 0.0), 5.0);
        let rim = mix(0.04, 1.0, fresnel) * frag.material.z;
        let fringe = frag.material.w;
        let rim_color = vec3<f32>(rim * (1.0 + fringe), rim, rim * (1.0 - fringe));
        lit = mix(lit, rim_color + lit * 0.25, transmission);
        alpha = clamp(alpha + fresnel, 0.0, 1.0);
    }

    return vec4<f32>(lit, alpha);
}
"#;

/// Unlit coloured lines for the axis gizmo.
pub const GIZMO_SHADER: &str = r#"
struct GizmoGlobals {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> gizmo: GizmoGlobals;

struct GizmoVertex {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct GizmoOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(vertex: GizmoVertex) -> GizmoOutput {
    var out: GizmoOutput;
    out.clip_position = gizmo.view_proj * vec4<f32>(vertex.position, 1.0);
    out.color = vertex.color;
    return out;
}

@fragment
fn fs_main(frag: GizmoOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(frag.color, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(source: &str) {
        let module = naga::front::wgsl::parse_str(source).unwrap_or_else(|e| panic!("WGSL parse error: {}", e.emit_to_string(source)));
        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::all())
            .validate(&module)
            .unwrap_or_else(|e| panic!("WGSL validation error: {:?}", e));
    }

    #[test]
    fn test_mesh_shader_is_valid() {
        validate(MESH_SHADER);
    }

    #[test]
    fn test_gizmo_shader_is_valid() {
        validate(GIZMO_SHADER);
    }

    #[test]
    fn test_mesh_shader_light_array_matches_rust() {
        let needle = format!("array<PointLight, {}>", super::super::MAX_POINT_LIGHTS);
        assert!(MESH_SHADER.contains(&needle));
    }
}

/// Shared per-frame uniforms. Layout mirrors `pack::Globals`.
const GLOBALS: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
    ambient: vec4<f32>,
    dir_dir: array<vec4<f32>, 2>,
    dir_color: array<vec4<f32>, 2>,
    point_pos: array<vec4<f32>, 4>,
    point_color: array<vec4<f32>, 4>,
    // x: directional count, y: point count, z: star size, w: elapsed
    counts: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;
"#;

const MESH_BODY: &str = r#"
const PI: f32 = 3.14159265;

struct Draw {
    model: mat4x4<f32>,
    // w > 0.5 samples the texture
    base_color: vec4<f32>,
    // x: roughness, y: metalness, z: env intensity
    params: vec4<f32>,
};

@group(1) @binding(0)
var<uniform> draw: Draw;
@group(1) @binding(1)
var albedo_tex: texture_2d<f32>;
@group(1) @binding(2)
var albedo_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec3<f32>,
    @location(3) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) color: vec3<f32>,
    @location(3) uv: vec2<f32>,
};

@vertex
fn vs_mesh(vertex: VertexInput) -> VertexOutput {
    let world = draw.model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = globals.view_proj * world;
    out.world_pos = world.xyz;
    out.world_normal = (draw.model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.color = vertex.color;
    out.uv = vertex.uv;
    return out;
}

fn shade(n: vec3<f32>, v: vec3<f32>, l: vec3<f32>, radiance: vec3<f32>, diffuse: vec3<f32>, specular: vec3<f32>, shininess: f32) -> vec3<f32> {
    let ndl = max(dot(n, l), 0.0);
    let h = normalize(l + v);
    let spec = pow(max(dot(n, h), 0.0), shininess) * (shininess + 8.0) / (8.0 * PI);
    return radiance * ndl * (diffuse / PI + specular * spec);
}

@fragment
fn fs_mesh(in: VertexOutput) -> @location(0) vec4<f32> {
    var albedo = draw.base_color.rgb * in.color;
    if (draw.base_color.w > 0.5) {
        albedo = albedo * textureSample(albedo_tex, albedo_sampler, in.uv).rgb;
    }
    let roughness = clamp(draw.params.x, 0.04, 1.0);
    let metalness = clamp(draw.params.y, 0.0, 1.0);
    let diffuse = albedo * (1.0 - metalness);
    let specular = mix(vec3<f32>(0.04), albedo, metalness);
    let shininess = mix(256.0, 2.0, roughness);

    var n = normalize(in.world_normal);
    let v = normalize(globals.camera_pos.xyz - in.world_pos);
    if (dot(n, v) < 0.0) {
        n = -n;
    }

    var color = globals.ambient.rgb * diffuse / PI * draw.params.z;
    let dirs = u32(globals.counts.x);
    for (var i = 0u; i < dirs; i = i + 1u) {
        color = color + shade(n, v, -globals.dir_dir[i].xyz, globals.dir_color[i].rgb, diffuse, specular, shininess);
    }
    let points = u32(globals.counts.y);
    for (var i = 0u; i < points; i = i + 1u) {
        let to_light = globals.point_pos[i].xyz - in.world_pos;
        let d = length(to_light);
        let range = globals.point_pos[i].w;
        var falloff = 1.0 / max(d * d, 0.01);
        if (range > 0.0) {
            let k = clamp(1.0 - pow(d / range, 4.0), 0.0, 1.0);
            falloff = falloff * k * k;
        }
        color = color + shade(n, v, to_light / max(d, 1e-4), globals.point_color[i].rgb * falloff, diffuse, specular, shininess);
    }
    return vec4<f32>(color, 1.0);
}
"#;

const STAR_BODY: &str = r#"
struct StarInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct StarOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) corner: vec2<f32>,
};

@vertex
fn vs_star(@builtin(vertex_index) index: u32, star: StarInput) -> StarOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0), vec2<f32>(1.0, -1.0), vec2<f32>(1.0, 1.0),
        vec2<f32>(1.0, 1.0), vec2<f32>(-1.0, 1.0), vec2<f32>(-1.0, -1.0),
    );
    let corner = corners[index];
    let half = globals.counts.z * 0.5;
    let world = star.position
        + globals.camera_right.xyz * corner.x * half
        + globals.camera_up.xyz * corner.y * half;
    var out: StarOutput;
    out.clip_position = globals.view_proj * vec4<f32>(world, 1.0);
    out.color = star.color;
    out.corner = corner;
    return out;
}

@fragment
fn fs_star(in: StarOutput) -> @location(0) vec4<f32> {
    let r = length(in.corner);
    if (r > 1.0) {
        discard;
    }
    let glow = 1.0 - smoothstep(0.6, 1.0, r);
    return vec4<f32>(in.color * glow, glow);
}
"#;

pub fn mesh_shader() -> String {
    format!("{GLOBALS}{MESH_BODY}")
}

pub fn star_shader() -> String {
    format!("{GLOBALS}{STAR_BODY}")
}

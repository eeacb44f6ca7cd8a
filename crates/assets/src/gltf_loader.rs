use crate::loader::{AssetError, AssetLoader, LoadFuture};
use crate::model::{LoadedModel, Texture, TextureOptions};
use futures::FutureExt;
use futures::channel::oneshot;
use glam::{Quat, Vec2, Vec3};
use gltf::animation::Interpolation;
use gltf::animation::util::ReadOutputs;
use gltf::buffer::Data;
use gltf::mesh::Mode;
use starfolio_animation::{AnimationClip, Track, TrackValues};
use starfolio_common::{NodeId, Rgb, Transform};
use starfolio_scene::{Drawable, Material, Mesh, NodeTree, SceneNode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Loads `.gltf` (external or base64-embedded buffers) and `.glb` models and
/// PNG textures relative to a root directory. Every request runs on its own
/// worker thread; the returned future resolves when that thread finishes.
#[derive(Debug, Clone)]
pub struct GltfLoader {
    root: PathBuf,
}

impl GltfLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetLoader for GltfLoader {
    fn load_model(&self, path: &str) -> LoadFuture<LoadedModel> {
        let full = self.root.join(path);
        on_worker(path, move || read_model(&full))
    }

    fn load_texture(&self, path: &str, options: TextureOptions) -> LoadFuture<Texture> {
        let full = self.root.join(path);
        on_worker(path, move || read_texture(&full, options))
    }
}

fn on_worker<T, F>(label: &str, job: F) -> LoadFuture<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AssetError> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let label = label.to_string();
    let spawned = std::thread::Builder::new()
        .name(format!("load:{label}"))
        .spawn(move || {
            // Receiver is gone if the session ended first.
            let _ = tx.send(job());
        });
    if let Err(source) = spawned {
        let err = AssetError::Io {
            path: PathBuf::from(&label),
            source,
        };
        return futures::future::ready(Err(err)).boxed();
    }
    async move {
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(AssetError::Cancelled(label)),
        }
    }
    .boxed()
}

fn read_file(path: &Path) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_texture(path: &Path, options: TextureOptions) -> Result<Texture, AssetError> {
    let bytes = read_file(path)?;
    let image = image::load_from_memory(&bytes)?.to_rgba8();
    tracing::debug!(path = %path.display(), width = image.width(), height = image.height(), "texture decoded");
    Ok(Texture {
        width: image.width(),
        height: image.height(),
        pixels: image.into_raw(),
        options,
    })
}

fn read_model(path: &Path) -> Result<LoadedModel, AssetError> {
    let bytes = read_file(path)?;
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(&bytes)?;
    let base = path.parent().unwrap_or(Path::new("."));
    let buffers = gltf::import_buffers(&document, Some(base), blob)?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    let model = Importer {
        doc: &document,
        buffers: &buffers,
    }
    .build(name)?;
    tracing::debug!(
        path = %path.display(),
        nodes = model.tree.len(),
        clips = model.clips.len(),
        "model parsed"
    );
    Ok(model)
}

fn parse_err(msg: impl Into<String>) -> AssetError {
    AssetError::GltfParse(msg.into())
}

/// Keeps the value of each (in-tangent, value, out-tangent) triple.
fn spline_values<T>(values: Vec<T>, cubic: bool) -> Vec<T> {
    if cubic {
        values.into_iter().skip(1).step_by(3).collect()
    } else {
        values
    }
}

fn node_transform(node: &gltf::Node<'_>) -> Transform {
    let (position, rotation, scale) = node.transform().decomposed();
    Transform {
        position: Vec3::from_array(position),
        rotation: Quat::from_array(rotation).normalize(),
        scale: Vec3::from_array(scale),
    }
}

fn material_from(def: &gltf::Material<'_>) -> Material {
    let pbr = def.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    Material {
        base_color: Rgb::new(r, g, b),
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        ..Material::default()
    }
}

struct Importer<'a> {
    doc: &'a gltf::Document,
    buffers: &'a [Data],
}

impl Importer<'_> {
    fn buffer(&self, buffer: gltf::Buffer<'_>) -> Option<&[u8]> {
        self.buffers.get(buffer.index()).map(|d| d.0.as_slice())
    }

    fn build(&self, name: &str) -> Result<LoadedModel, AssetError> {
        let names = self.node_names(name);
        let nodes: Vec<gltf::Node<'_>> = self.doc.nodes().collect();
        let mut tree = NodeTree::new(SceneNode::group(name));
        let roots: Vec<usize> = match self.doc.default_scene().or_else(|| self.doc.scenes().next()) {
            Some(scene) => scene.nodes().map(|n| n.index()).collect(),
            None => self.parentless_nodes(),
        };

        let mut visited = vec![false; nodes.len()];
        let mut stack: Vec<(usize, NodeId)> = roots.into_iter().rev().map(|n| (n, tree.root())).collect();
        while let Some((index, parent)) = stack.pop() {
            let node = nodes
                .get(index)
                .ok_or_else(|| parse_err(format!("node {index} does not exist")))?;
            if std::mem::replace(&mut visited[index], true) {
                return Err(parse_err(format!("node {index} appears twice in the hierarchy")));
            }
            let scene_node = match node.mesh() {
                Some(mesh) => SceneNode::drawable(names[index].clone(), self.drawable(&mesh)),
                None => SceneNode::group(names[index].clone()),
            };
            let id = tree.add(parent, scene_node.with_transform(node_transform(node)))?;
            let children: Vec<usize> = node.children().map(|c| c.index()).collect();
            stack.extend(children.into_iter().rev().map(|c| (c, id)));
        }

        let clips = self.doc.animations().map(|a| self.clip(&a, &names)).collect();
        Ok(LoadedModel::new(name, tree).with_clips(clips))
    }

    /// Node names made unique, and distinct from the model root's name, so
    /// animation tracks resolve unambiguously inside the model.
    fn node_names(&self, root: &str) -> Vec<String> {
        let mut seen: HashMap<String, usize> = HashMap::from([(root.to_string(), 1)]);
        self.doc
            .nodes()
            .map(|n| {
                let base = n.name().map_or_else(|| format!("node_{}", n.index()), str::to_string);
                let count = seen.entry(base.clone()).or_insert(0);
                *count += 1;
                if *count == 1 { base } else { format!("{base}_{}", n.index()) }
            })
            .collect()
    }

    fn parentless_nodes(&self) -> Vec<usize> {
        let mut has_parent = vec![false; self.doc.nodes().count()];
        for node in self.doc.nodes() {
            for child in node.children() {
                if let Some(flag) = has_parent.get_mut(child.index()) {
                    *flag = true;
                }
            }
        }
        (0..has_parent.len()).filter(|&i| !has_parent[i]).collect()
    }

    /// All triangle primitives of a mesh merged into one drawable. The
    /// material comes from the first primitive that names one.
    fn drawable(&self, def: &gltf::Mesh<'_>) -> Drawable {
        let mut mesh = Mesh::default();
        let mut colors = Vec::new();
        let mut any_colors = false;
        let mut uvs = Vec::new();
        let mut any_uvs = false;
        let mut material = None;

        for prim in def.primitives() {
            if prim.mode() != Mode::Triangles {
                tracing::debug!(mesh = def.index(), mode = ?prim.mode(), "skipping non-triangle primitive");
                continue;
            }
            let reader = prim.reader(|b| self.buffer(b));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<Vec3> = positions.map(Vec3::from_array).collect();
            let n = positions.len();
            let base = mesh.positions.len() as u32;

            let normals: Vec<Vec3> = reader
                .read_normals()
                .map(|it| it.map(Vec3::from_array).collect())
                .unwrap_or_default();
            if normals.len() == n {
                mesh.normals.extend(normals);
            } else {
                mesh.normals.extend(std::iter::repeat_n(Vec3::Y, n));
            }

            match reader.read_colors(0) {
                Some(c) => {
                    any_colors = true;
                    let c = c.into_rgb_f32().map(|[r, g, b]| Rgb::new(r, g, b));
                    colors.extend(c.chain(std::iter::repeat(Rgb::WHITE)).take(n));
                }
                None => colors.extend(std::iter::repeat_n(Rgb::WHITE, n)),
            }

            match reader.read_tex_coords(0) {
                Some(t) => {
                    any_uvs = true;
                    let t = t.into_f32().map(Vec2::from_array);
                    uvs.extend(t.chain(std::iter::repeat(Vec2::ZERO)).take(n));
                }
                None => uvs.extend(std::iter::repeat_n(Vec2::ZERO, n)),
            }

            match reader.read_indices() {
                Some(indices) => mesh.indices.extend(indices.into_u32().map(|i| i + base)),
                None => mesh.indices.extend(base..base + n as u32),
            }
            mesh.positions.extend(positions);

            let prim_material = prim.material();
            if material.is_none() && prim_material.index().is_some() {
                material = Some(material_from(&prim_material));
            }
        }

        if any_colors {
            mesh.colors = Some(colors);
        }
        if any_uvs {
            mesh.uvs = Some(uvs);
        }
        let mut material = material.unwrap_or_default();
        material.vertex_colors = any_colors;
        Drawable { mesh, material }
    }

    fn clip(&self, def: &gltf::Animation<'_>, names: &[String]) -> AnimationClip {
        let mut tracks = Vec::new();
        for channel in def.channels() {
            let Some(target) = names.get(channel.target().node().index()) else {
                continue;
            };
            let cubic = channel.sampler().interpolation() == Interpolation::CubicSpline;
            let reader = channel.reader(|b| self.buffer(b));
            let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs()) else {
                tracing::debug!(animation = def.index(), "channel without keyframes skipped");
                continue;
            };
            let values = match outputs {
                ReadOutputs::Translations(v) => {
                    TrackValues::Translation(spline_values(v.map(Vec3::from_array).collect(), cubic))
                }
                ReadOutputs::Scales(v) => TrackValues::Scale(spline_values(v.map(Vec3::from_array).collect(), cubic)),
                ReadOutputs::Rotations(r) => TrackValues::Rotation(spline_values(
                    r.into_f32().map(|q| Quat::from_array(q).normalize()).collect(),
                    cubic,
                )),
                ReadOutputs::MorphTargetWeights(_) => {
                    tracing::debug!(animation = def.index(), "morph target weights skipped");
                    continue;
                }
            };
            tracks.push(Track {
                target: target.clone(),
                times: inputs.collect(),
                values,
            });
        }
        let name = def
            .name()
            .map_or_else(|| format!("clip_{}", def.index()), str::to_string);
        AnimationClip::new(name, tracks)
    }
}

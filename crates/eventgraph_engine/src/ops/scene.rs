// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene object nodes backed by the [`Host`](crate::host::Host).
//!
//! Objects travel between nodes as [`Value::Object`] handles. Impure nodes
//! publish their results (`changed`, `object`) in the scratch store of the
//! current run, read back by producers on the same outputs. A mutation on
//! an object that does not exist reports `changed = false` and the flow
//! continues; getters on a missing object yield `None`.

use crate::evaluation::{EvaluationContext, NodeError};
use crate::host::{Host, ObjectKind};
use crate::node::{FieldSpec, NodeCategory, NodeRegistry, NodeType, RegistryError};
use crate::socket::{Socket, SocketType};
use crate::value::Value;

/// Active object handle
pub const GET_ACTIVE_OBJECT: &str = "scene.get_active_object";
/// Make an object active
pub const SET_ACTIVE_OBJECT: &str = "scene.set_active_object";
/// Look an object up by name
pub const FIND_OBJECT: &str = "scene.find_object";
/// Every object in the scene
pub const GET_ALL_OBJECTS: &str = "scene.get_all_objects";
/// Objects of a collection
pub const COLLECTION_OBJECTS: &str = "scene.collection_objects";
/// Create a new object
pub const CREATE_OBJECT: &str = "scene.create_object";
/// Delete an object
pub const DELETE_OBJECT: &str = "scene.delete_object";
/// Delete the active object, vetoed when there is none
pub const DELETE_ACTIVE_OBJECT: &str = "scene.delete_active_object";
/// Copy an object
pub const DUPLICATE_OBJECT: &str = "scene.duplicate_object";
/// Rename an object
pub const RENAME_OBJECT: &str = "scene.rename_object";
/// Object location
pub const GET_LOCATION: &str = "scene.get_location";
/// Move an object
pub const SET_LOCATION: &str = "scene.set_location";
/// Object rotation, euler radians
pub const GET_ROTATION: &str = "scene.get_rotation";
/// Rotate an object
pub const SET_ROTATION: &str = "scene.set_rotation";
/// Object scale
pub const GET_SCALE: &str = "scene.get_scale";
/// Scale an object
pub const SET_SCALE: &str = "scene.set_scale";
/// Object dimensions, bounding box size times scale
pub const GET_DIMENSION: &str = "scene.get_dimension";
/// Resize an object by rescaling it
pub const SET_DIMENSION: &str = "scene.set_dimension";
/// Viewport visibility
pub const GET_VISIBILITY: &str = "scene.get_visibility";
/// Show or hide an object in the viewport
pub const SET_VISIBILITY: &str = "scene.set_visibility";
/// Render visibility
pub const GET_RENDER_VISIBILITY: &str = "scene.get_render_visibility";
/// Include or exclude an object from renders
pub const SET_RENDER_VISIBILITY: &str = "scene.set_render_visibility";
/// Light intensity
pub const GET_LIGHT_INTENSITY: &str = "scene.get_light_intensity";
/// Change a light's intensity
pub const SET_LIGHT_INTENSITY: &str = "scene.set_light_intensity";

const KINDS: [&str; 3] = ["Mesh", "Light", "Empty"];

/// One vector of an object's transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Location,
    Rotation,
    Scale,
    Dimension,
}

impl Channel {
    fn socket(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Rotation => "rotation",
            Self::Scale => "scale",
            Self::Dimension => "dimension",
        }
    }

    fn read(self, host: &dyn Host, object: &str) -> Option<[f64; 3]> {
        let transform = host.transform(object)?;
        Some(match self {
            Self::Location => transform.location,
            Self::Rotation => transform.rotation,
            Self::Scale => transform.scale,
            Self::Dimension => {
                let bounds = host.bounds(object)?;
                std::array::from_fn(|i| bounds[i] * transform.scale[i])
            }
        })
    }

    /// Write the channel, `false` when the object does not exist
    fn write(self, host: &mut dyn Host, object: &str, vector: [f64; 3]) -> bool {
        let Some(mut transform) = host.transform(object) else {
            return false;
        };
        match self {
            Self::Location => transform.location = vector,
            Self::Rotation => transform.rotation = vector,
            Self::Scale => transform.scale = vector,
            Self::Dimension => {
                let Some(bounds) = host.bounds(object) else {
                    return false;
                };
                // Flat axes cannot be resized and keep their scale
                for ((scale, size), target) in transform.scale.iter_mut().zip(bounds).zip(vector) {
                    if size != 0.0 {
                        *scale = target / size;
                    }
                }
            }
        }
        host.set_transform(object, transform)
    }
}

fn get_channel(id: &str, name: &str, description: &str, channel: Channel) -> NodeType {
    NodeType::pure(id, name, NodeCategory::Scene)
        .describe(description)
        .input(object_input())
        .output(Socket::output(channel.socket(), SocketType::Array))
        .produce(channel.socket(), move |ctx| {
            let object = ctx.input_object("object")?;
            Ok(channel.read(ctx.host(), &object).map_or(Value::None, |v| {
                Value::Array(v.iter().map(|c| Value::Float(*c)).collect())
            }))
        })
}

fn set_channel(id: &str, name: &str, description: &str, channel: Channel) -> NodeType {
    let input = Socket::input(channel.socket(), SocketType::Array);
    let input = match channel {
        Channel::Scale => input.with_default(Value::Array(vec![Value::Float(1.0); 3])),
        _ => input,
    };
    mutator(id, name, description).input(input).effect(move |ctx| {
        let object = ctx.input_object("object")?;
        let vector = vector3(channel.socket(), ctx.input_items(channel.socket())?)?;
        let changed = channel.write(ctx.host(), &object, vector);
        finish(ctx, changed);
        Ok(())
    })
}

fn object_input() -> Socket {
    Socket::input("object", SocketType::Object)
}

fn object_output() -> Socket {
    Socket::output("object", SocketType::Object)
}

fn object_value(name: Option<String>) -> Value {
    name.map_or(Value::None, Value::Object)
}

/// Impure node with `exec` in/out, publishing `changed` from its effect
fn mutator(id: &str, name: &str, description: &str) -> NodeType {
    NodeType::impure(id, name, NodeCategory::Scene)
        .describe(description)
        .input(Socket::exec_input("exec"))
        .input(object_input())
        .output(Socket::exec_output("exec"))
        .output(Socket::output("changed", SocketType::Value))
        .produce("changed", |ctx| Ok(ctx.scratch("changed")))
}

fn finish(ctx: &mut EvaluationContext<'_>, changed: bool) {
    if !changed {
        tracing::debug!(node = %ctx.node().label, "scene object unchanged");
    }
    ctx.set_scratch("changed", changed);
    ctx.trigger("exec");
}

/// Register the scene nodes
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    // Active object
    registry.register(
        NodeType::pure(GET_ACTIVE_OBJECT, "Get Active Object", NodeCategory::Scene)
            .describe("Get the active object")
            .output(object_output())
            .produce("object", |ctx| Ok(object_value(ctx.host().active_object()))),
    )?;

    registry.register(
        NodeType::impure(SET_ACTIVE_OBJECT, "Set Active Object", NodeCategory::Scene)
            .describe("Make an object active")
            .input(Socket::exec_input("exec"))
            .input(object_input())
            .output(Socket::exec_output("success"))
            .output(Socket::exec_output("failed"))
            .effect(|ctx| {
                let object = ctx.input_object("object")?;
                let next = if ctx.host().set_active_object(&object) { "success" } else { "failed" };
                ctx.trigger(next);
                Ok(())
            }),
    )?;

    // Lookup
    registry.register(
        NodeType::pure(FIND_OBJECT, "Find Object", NodeCategory::Scene)
            .describe("Find an object by name, None if it does not exist")
            .input(Socket::input("name", SocketType::Value).with_default(""))
            .output(object_output())
            .produce("object", |ctx| {
                let name = ctx.input_string("name")?;
                let exists = ctx.host().object_exists(&name);
                Ok(object_value(exists.then_some(name)))
            }),
    )?;

    registry.register(
        NodeType::pure(GET_ALL_OBJECTS, "Get All Objects", NodeCategory::Scene)
            .describe("Get every object of the scene")
            .output(Socket::output("objects", SocketType::Array))
            .produce("objects", |ctx| {
                let names = ctx.host().object_names();
                Ok(Value::Array(names.into_iter().map(Value::Object).collect()))
            }),
    )?;

    registry.register(
        NodeType::pure(COLLECTION_OBJECTS, "Collection Objects", NodeCategory::Scene)
            .describe("Get the objects of a collection")
            .input(Socket::input("collection", SocketType::Value).with_default("Collection"))
            .output(Socket::output("objects", SocketType::Array))
            .produce("objects", |ctx| {
                let collection = ctx.input_string("collection")?;
                let names = ctx
                    .host()
                    .collection_objects(&collection)
                    .ok_or_else(|| NodeError::invalid("collection", format!("no collection '{collection}'")))?;
                Ok(Value::Array(names.into_iter().map(Value::Object).collect()))
            }),
    )?;

    // Lifecycle
    registry.register(
        NodeType::impure(CREATE_OBJECT, "Create Object", NodeCategory::Scene)
            .describe("Create a new object; the name is made unique")
            .field(FieldSpec::choice("kind", &KINDS))
            .input(Socket::exec_input("exec"))
            .input(Socket::input("name", SocketType::Value).with_default("Object"))
            .input(Socket::input("collection", SocketType::Value).with_default(""))
            .output(Socket::exec_output("exec"))
            .output(object_output())
            .produce("object", |ctx| Ok(ctx.scratch("object")))
            .effect(|ctx| {
                let name = ctx.input_string("name")?;
                if name.is_empty() {
                    return Err(NodeError::invalid("name", "object name is empty"));
                }
                let collection = ctx.input_string("collection")?;
                let kind = match ctx.field_str("kind").as_str() {
                    "Light" => ObjectKind::Light,
                    "Empty" => ObjectKind::Empty,
                    _ => ObjectKind::Mesh,
                };
                let collection = (!collection.is_empty()).then_some(collection.as_str());
                let created = ctx.host().create_object(&name, kind, collection);
                ctx.set_scratch("object", Value::Object(created));
                ctx.trigger("exec");
                Ok(())
            }),
    )?;

    registry.register(mutator(DELETE_OBJECT, "Delete Object", "Delete an object").effect(|ctx| {
        let object = ctx.input_object("object")?;
        let changed = ctx.host().delete_object(&object);
        finish(ctx, changed);
        Ok(())
    }))?;

    registry.register(
        NodeType::impure(DELETE_ACTIVE_OBJECT, "Delete Active Object", NodeCategory::Scene)
            .describe("Delete the active object")
            .input(Socket::exec_input("exec"))
            .output(Socket::exec_output("exec"))
            .guard(|ctx| Ok(ctx.host().active_object().is_some()))
            .effect(|ctx| {
                let active = ctx.host().active_object();
                if let Some(active) = active {
                    ctx.host().delete_object(&active);
                }
                ctx.trigger("exec");
                Ok(())
            }),
    )?;

    registry.register(
        mutator(DUPLICATE_OBJECT, "Duplicate Object", "Duplicate an object")
            .output(object_output())
            .produce("object", |ctx| Ok(ctx.scratch("object")))
            .effect(|ctx| {
                let object = ctx.input_object("object")?;
                let copy = ctx.host().duplicate_object(&object);
                let changed = copy.is_some();
                ctx.set_scratch("object", object_value(copy));
                finish(ctx, changed);
                Ok(())
            }),
    )?;

    registry.register(
        mutator(RENAME_OBJECT, "Rename Object", "Rename an object")
            .input(Socket::input("name", SocketType::Value).with_default(""))
            .effect(|ctx| {
                let object = ctx.input_object("object")?;
                let name = ctx.input_string("name")?;
                if name.is_empty() {
                    return Err(NodeError::invalid("name", "object name is empty"));
                }
                let changed = ctx.host().rename_object(&object, &name);
                finish(ctx, changed);
                Ok(())
            }),
    )?;

    // Transform
    let channels = [
        (GET_LOCATION, "Get Location", SET_LOCATION, "Set Location", Channel::Location),
        (GET_ROTATION, "Get Rotation", SET_ROTATION, "Set Rotation", Channel::Rotation),
        (GET_SCALE, "Get Scale", SET_SCALE, "Set Scale", Channel::Scale),
        (GET_DIMENSION, "Get Dimension", SET_DIMENSION, "Set Dimension", Channel::Dimension),
    ];
    for (get_id, get_name, set_id, set_name, channel) in channels {
        let what = channel.socket();
        registry.register(get_channel(get_id, get_name, &format!("Get the {what} of an object as [x, y, z]"), channel))?;
        registry.register(set_channel(set_id, set_name, &format!("Set the {what} of an object to [x, y, z]"), channel))?;
    }

    // Visibility
    registry.register(
        NodeType::pure(GET_VISIBILITY, "Get Viewport Visibility", NodeCategory::Scene)
            .describe("Whether an object is visible in the viewport")
            .input(object_input())
            .output(Socket::output("visible", SocketType::Value))
            .produce("visible", |ctx| {
                let object = ctx.input_object("object")?;
                Ok(ctx.host().visible(&object).map_or(Value::None, Value::Bool))
            }),
    )?;

    registry.register(
        mutator(SET_VISIBILITY, "Set Viewport Visibility", "Show or hide an object in the viewport")
            .input(Socket::input("visible", SocketType::Value).with_default(true))
            .effect(|ctx| {
                let object = ctx.input_object("object")?;
                let visible = ctx.input_bool("visible")?;
                let changed = ctx.host().set_visible(&object, visible);
                finish(ctx, changed);
                Ok(())
            }),
    )?;

    registry.register(
        NodeType::pure(GET_RENDER_VISIBILITY, "Get Render Visibility", NodeCategory::Scene)
            .describe("Whether an object shows up in renders")
            .input(object_input())
            .output(Socket::output("visible", SocketType::Value))
            .produce("visible", |ctx| {
                let object = ctx.input_object("object")?;
                Ok(ctx.host().render_visible(&object).map_or(Value::None, Value::Bool))
            }),
    )?;

    registry.register(
        mutator(SET_RENDER_VISIBILITY, "Set Render Visibility", "Include or exclude an object from renders")
            .input(Socket::input("visible", SocketType::Value).with_default(true))
            .effect(|ctx| {
                let object = ctx.input_object("object")?;
                let visible = ctx.input_bool("visible")?;
                let changed = ctx.host().set_render_visible(&object, visible);
                finish(ctx, changed);
                Ok(())
            }),
    )?;

    // Lights
    registry.register(
        NodeType::pure(GET_LIGHT_INTENSITY, "Get Light Intensity", NodeCategory::Scene)
            .describe("Intensity of a light, None for other objects")
            .input(object_input())
            .output(Socket::output("intensity", SocketType::Value))
            .produce("intensity", |ctx| {
                let object = ctx.input_object("object")?;
                Ok(ctx.host().light_intensity(&object).map_or(Value::None, Value::Float))
            }),
    )?;

    registry.register(
        mutator(SET_LIGHT_INTENSITY, "Set Light Intensity", "Change the intensity of a light")
            .input(Socket::input("intensity", SocketType::Value).with_default(1000.0))
            .effect(|ctx| {
                let object = ctx.input_object("object")?;
                let intensity = ctx.input_float("intensity")?;
                if intensity < 0.0 {
                    return Err(NodeError::invalid("intensity", "intensity cannot be negative"));
                }
                let changed = ctx.host().set_light_intensity(&object, intensity);
                finish(ctx, changed);
                Ok(())
            }),
    )?;

    Ok(())
}

fn vector3(socket: &str, items: Vec<Value>) -> Result<[f64; 3], NodeError> {
    if items.len() != 3 {
        return Err(NodeError::invalid(
            socket,
            format!("expected 3 components, got {}", items.len()),
        ));
    }
    let mut vector = [0.0; 3];
    for (slot, item) in vector.iter_mut().zip(items) {
        *slot = item.to_float()?;
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::ops::harness::Harness;
    use crate::ops::utility::PRINT;

    fn scene() -> Harness {
        let mut host = MemoryHost::new();
        host.create_object("Cube", ObjectKind::Mesh, None);
        host.create_object("Lamp", ObjectKind::Light, Some("Lights"));
        Harness::with_host(host)
    }

    fn object(name: &str) -> Value {
        Value::Object(name.to_string())
    }

    #[test]
    fn test_find_and_list() {
        let mut h = scene();
        let found = h.apply(FIND_OBJECT, &[("name", Value::from("Cube"))], "object");
        assert_eq!(found.unwrap(), object("Cube"));
        let missing = h.apply(FIND_OBJECT, &[("name", Value::from("Sphere"))], "object");
        assert_eq!(missing.unwrap(), Value::None);

        let all = h.apply(GET_ALL_OBJECTS, &[], "objects").unwrap();
        assert_eq!(all.to_string(), "[Cube, Lamp]");
        let lights = h.apply(COLLECTION_OBJECTS, &[("collection", Value::from("Lights"))], "objects");
        assert_eq!(lights.unwrap(), Value::Array(vec![object("Lamp")]));
        assert!(h.apply(COLLECTION_OBJECTS, &[("collection", Value::from("Nope"))], "objects").is_err());
    }

    #[test]
    fn test_set_active_branches() {
        let mut h = scene();
        let set = h.add(SET_ACTIVE_OBJECT);
        let ok = h.add(PRINT);
        let failed = h.add(PRINT);
        let ok_text = h.literal("ok");
        let failed_text = h.literal("failed");
        h.link(set, "success", ok, "exec");
        h.link(set, "failed", failed, "exec");
        h.link(ok_text, "value", ok, "value");
        h.link(failed_text, "value", failed, "value");

        h.set_default(set, "object", object("Cube"));
        h.run(set);
        assert_eq!(h.printed(), vec!["ok"]);
        let active = h.add(GET_ACTIVE_OBJECT);
        assert_eq!(h.pull(active, "object").unwrap(), object("Cube"));

        h.set_default(set, "object", object("Ghost"));
        h.run(set);
        assert_eq!(h.printed(), vec!["failed"]);
    }

    #[test]
    fn test_find_feeds_object_socket() {
        let mut h = scene();
        let find = h.add(FIND_OBJECT);
        let visibility = h.add(SET_VISIBILITY);
        let read = h.add(GET_VISIBILITY);
        h.set_default(find, "name", "Cube");
        h.set_default(visibility, "visible", false);
        h.link(find, "object", visibility, "object");
        h.link(find, "object", read, "object");

        let summary = h.run(visibility);
        assert!(summary.is_clean());
        assert_eq!(h.pull(visibility, "changed").unwrap(), Value::Bool(true));
        assert_eq!(h.pull(read, "visible").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_create_object_instance_scratch() {
        let mut h = scene();
        let create = h.add(CREATE_OBJECT);
        h.set_default(create, "name", "Cube");

        h.run(create);
        assert_eq!(h.pull(create, "object").unwrap(), object("Cube.001"));
        let first_keys: Vec<String> = h.engine.store().dump().into_iter().map(|(k, _)| k).collect();
        assert_eq!(first_keys.len(), 1);

        h.run(create);
        assert_eq!(h.pull(create, "object").unwrap(), object("Cube.002"));
        let second_keys: Vec<String> = h.engine.store().dump().into_iter().map(|(k, _)| k).collect();
        assert_eq!(second_keys.len(), 1);
        assert_ne!(first_keys, second_keys);
    }

    #[test]
    fn test_create_light_and_intensity() {
        let mut h = scene();
        let create = h.add_with(CREATE_OBJECT, &[("kind", Value::from("Light"))]);
        let set = h.add(SET_LIGHT_INTENSITY);
        let get = h.add(GET_LIGHT_INTENSITY);
        h.set_default(create, "name", "Sun");
        h.set_default(set, "intensity", 250.0);
        h.link(create, "exec", set, "exec");
        h.link(create, "object", set, "object");
        h.set_default(get, "object", object("Sun"));

        let summary = h.run(create);
        assert_eq!(summary.executed, 2);
        assert_eq!(h.pull(get, "intensity").unwrap(), Value::Float(250.0));

        h.set_default(get, "object", object("Cube"));
        assert_eq!(h.pull(get, "intensity").unwrap(), Value::None);
    }

    #[test]
    fn test_location_roundtrip_through_host() {
        let mut h = scene();
        let set = h.add(SET_LOCATION);
        let get = h.add(GET_LOCATION);
        h.set_default(set, "object", object("Cube"));
        h.set_default(set, "location", Value::Array(vec![Value::Int(1), Value::Float(2.5), Value::Int(-3)]));
        h.set_default(get, "object", object("Cube"));

        h.run(set);
        assert_eq!(h.pull(get, "location").unwrap().to_string(), "[1.0, 2.5, -3.0]");

        h.set_default(set, "location", Value::Array(vec![Value::Int(1)]));
        assert_eq!(h.run(set).failed, 1);
    }

    #[test]
    fn test_rotation_and_scale_channels() {
        let mut h = scene();
        let rotate = h.add(SET_ROTATION);
        let scale = h.add(SET_SCALE);
        h.set_default(rotate, "object", object("Cube"));
        h.set_default(rotate, "rotation", Value::Array(vec![Value::Float(0.5), Value::Int(0), Value::Int(1)]));
        h.set_default(scale, "object", object("Cube"));
        h.link(rotate, "exec", scale, "exec");

        let summary = h.run(rotate);
        assert_eq!(summary.executed, 2);
        let rotation = h.apply(GET_ROTATION, &[("object", object("Cube"))], "rotation");
        assert_eq!(rotation.unwrap().to_string(), "[0.5, 0.0, 1.0]");
        // Unlinked scale defaults to identity
        let scaled = h.apply(GET_SCALE, &[("object", object("Cube"))], "scale");
        assert_eq!(scaled.unwrap().to_string(), "[1.0, 1.0, 1.0]");
        let location = h.apply(GET_LOCATION, &[("object", object("Cube"))], "location");
        assert_eq!(location.unwrap().to_string(), "[0.0, 0.0, 0.0]");
        let missing = h.apply(GET_ROTATION, &[("object", object("Ghost"))], "rotation");
        assert_eq!(missing.unwrap(), Value::None);
    }

    #[test]
    fn test_dimension_rescales() {
        let mut h = scene();
        let size = h.apply(GET_DIMENSION, &[("object", object("Cube"))], "dimension");
        assert_eq!(size.unwrap().to_string(), "[2.0, 2.0, 2.0]");

        let resize = h.add(SET_DIMENSION);
        h.set_default(resize, "object", object("Cube"));
        h.set_default(resize, "dimension", Value::Array(vec![Value::Int(4), Value::Int(1), Value::Int(2)]));
        h.run(resize);
        assert_eq!(h.pull(resize, "changed").unwrap(), Value::Bool(true));
        let scale = h.apply(GET_SCALE, &[("object", object("Cube"))], "scale");
        assert_eq!(scale.unwrap().to_string(), "[2.0, 0.5, 1.0]");

        // A light has no extent, so its scale stays put
        h.set_default(resize, "object", object("Lamp"));
        h.run(resize);
        let scale = h.apply(GET_SCALE, &[("object", object("Lamp"))], "scale");
        assert_eq!(scale.unwrap().to_string(), "[1.0, 1.0, 1.0]");
    }

    #[test]
    fn test_render_visibility() {
        let mut h = scene();
        let hide = h.add(SET_RENDER_VISIBILITY);
        h.set_default(hide, "object", object("Lamp"));
        h.set_default(hide, "visible", false);
        assert!(h.run(hide).is_clean());

        let render = h.apply(GET_RENDER_VISIBILITY, &[("object", object("Lamp"))], "visible");
        assert_eq!(render.unwrap(), Value::Bool(false));
        let viewport = h.apply(GET_VISIBILITY, &[("object", object("Lamp"))], "visible");
        assert_eq!(viewport.unwrap(), Value::Bool(true));
        let missing = h.apply(GET_RENDER_VISIBILITY, &[("object", object("Ghost"))], "visible");
        assert_eq!(missing.unwrap(), Value::None);
    }

    #[test]
    fn test_duplicate_rename_delete() {
        let mut h = scene();
        let duplicate = h.add(DUPLICATE_OBJECT);
        let rename = h.add(RENAME_OBJECT);
        let delete = h.add(DELETE_OBJECT);
        h.set_default(duplicate, "object", object("Cube"));
        h.set_default(rename, "name", "Copy");
        h.link(duplicate, "exec", rename, "exec");
        h.link(duplicate, "object", rename, "object");
        h.link(rename, "exec", delete, "exec");
        h.set_default(delete, "object", object("Cube"));

        let summary = h.run(duplicate);
        assert_eq!(summary.executed, 3);
        assert_eq!(h.pull(duplicate, "object").unwrap(), object("Cube.001"));
        assert_eq!(h.pull(rename, "changed").unwrap(), Value::Bool(true));
        assert_eq!(h.pull(delete, "changed").unwrap(), Value::Bool(true));

        let all = h.apply(GET_ALL_OBJECTS, &[], "objects").unwrap();
        assert_eq!(all.to_string(), "[Lamp, Copy]");

        // Missing objects report no change but keep the flow going
        let after = h.add(PRINT);
        h.link(delete, "exec", after, "exec");
        h.run(delete);
        assert_eq!(h.pull(delete, "changed").unwrap(), Value::Bool(false));
        assert_eq!(h.printed(), vec!["None"]);
    }

    #[test]
    fn test_unset_object_fails() {
        let mut h = scene();
        let delete = h.add(DELETE_OBJECT);
        assert_eq!(h.run(delete).failed, 1);
    }

    #[test]
    fn test_delete_active_guard() {
        let mut h = scene();
        let delete = h.add(DELETE_ACTIVE_OBJECT);
        let summary = h.run(delete);
        assert_eq!(summary.vetoed, 1);
        assert_eq!(summary.executed, 0);

        let set = h.add(SET_ACTIVE_OBJECT);
        h.set_default(set, "object", object("Lamp"));
        h.link(set, "success", delete, "exec");
        let summary = h.run(set);
        assert_eq!(summary.executed, 2);
        let all = h.apply(GET_ALL_OBJECTS, &[], "objects").unwrap();
        assert_eq!(all.to_string(), "[Cube]");
    }
}

//! Extraction of typed descriptors from an element's untyped property bag.
//!
//! Prop names follow the scene surface: `attributes`, `arrayStride`,
//! `stepMode`, `vertexCount`, `vertices` on `vertexBuffer`, and `code` on
//! `shaders`.

use lumen_markup::{Props, Value};

use super::descriptor::{ShaderDescriptor, VertexBufferDescriptor, VertexLayout, VertexProducer};
use super::{ElementKind, HostError};

const VB: ElementKind = ElementKind::VertexBuffer;

impl VertexBufferDescriptor {
    pub fn from_props(props: &Props) -> Result<Self, HostError> {
        let array_stride = u64::from(required_u32(props, VB, "arrayStride")?);
        let vertex_count = required_u32(props, VB, "vertexCount")?;
        let step_mode = match props.get("stepMode") {
            None => wgpu::VertexStepMode::Vertex,
            Some(v) => parse_step_mode(v).ok_or_else(|| invalid(
                VB,
                "stepMode",
                format!("expected `vertex` or `instance`, got {v:?}"),
            ))?,
        };

        let mut layout = VertexLayout::new(array_stride, step_mode);
        if let Some(value) = props.get("attributes") {
            let items = value
                .as_list()
                .ok_or_else(|| invalid(VB, "attributes", format!("expected a list, got a {}", value.type_name())))?;
            for (i, item) in items.iter().enumerate() {
                let attr = parse_attribute(item)
                    .map_err(|reason| invalid(VB, "attributes", format!("entry {i}: {reason}")))?;
                layout.attributes.push(attr);
            }
        }

        let vertices = props
            .get("vertices")
            .ok_or_else(|| invalid(VB, "vertices", "missing".to_string()))?;
        let data = parse_floats(vertices).map_err(|reason| invalid(VB, "vertices", reason))?;

        Ok(Self::new(layout, vertex_count, VertexProducer::from_vec(data)))
    }
}

impl ShaderDescriptor {
    pub fn from_props(props: &Props) -> Result<Self, HostError> {
        match props.get("code") {
            Some(Value::Str(code)) => Ok(Self::new(code.clone())),
            Some(other) => Err(invalid(
                ElementKind::Shaders,
                "code",
                format!("expected a string, got a {}", other.type_name()),
            )),
            None => Err(invalid(ElementKind::Shaders, "code", "missing".to_string())),
        }
    }
}

fn invalid(kind: ElementKind, prop: &'static str, reason: String) -> HostError {
    HostError::InvalidProp { kind, prop, reason }
}

fn as_u32(value: &Value) -> Result<u32, String> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX) => Ok(*n as u32),
        Value::Number(n) => Err(format!("expected a non-negative integer, got {n}")),
        other => Err(format!("expected a number, got a {}", other.type_name())),
    }
}

fn required_u32(props: &Props, kind: ElementKind, key: &'static str) -> Result<u32, HostError> {
    let value = props
        .get(key)
        .ok_or_else(|| invalid(kind, key, "missing".to_string()))?;
    as_u32(value).map_err(|reason| invalid(kind, key, reason))
}

fn parse_step_mode(value: &Value) -> Option<wgpu::VertexStepMode> {
    match value.as_str()? {
        "vertex" => Some(wgpu::VertexStepMode::Vertex),
        "instance" => Some(wgpu::VertexStepMode::Instance),
        _ => None,
    }
}

/// `{ shaderLocation, offset, format }`
fn parse_attribute(value: &Value) -> Result<wgpu::VertexAttribute, String> {
    let record = value
        .as_record()
        .ok_or_else(|| format!("expected a record, got a {}", value.type_name()))?;

    let field = |key: &str| record.get(key).ok_or_else(|| format!("missing `{key}`"));

    let shader_location = as_u32(field("shaderLocation")?).map_err(|e| format!("shaderLocation: {e}"))?;
    let offset = u64::from(as_u32(field("offset")?).map_err(|e| format!("offset: {e}"))?);
    let format_value = field("format")?;
    let format = format_value
        .as_str()
        .and_then(parse_vertex_format)
        .ok_or_else(|| format!("unknown vertex format {format_value:?}"))?;

    Ok(wgpu::VertexAttribute { format, offset, shader_location })
}

fn parse_floats(value: &Value) -> Result<Vec<f32>, String> {
    let items = value
        .as_list()
        .ok_or_else(|| format!("expected a list of numbers, got a {}", value.type_name()))?;
    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_number()
                .map(|n| n as f32)
                .ok_or_else(|| format!("entry {i} is a {}, expected a number", v.type_name()))
        })
        .collect()
}

/// Vertex formats by their WebGPU names.
pub(crate) fn parse_vertex_format(name: &str) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;
    Some(match name {
        "uint8x2" => F::Uint8x2,
        "uint8x4" => F::Uint8x4,
        "sint8x2" => F::Sint8x2,
        "sint8x4" => F::Sint8x4,
        "unorm8x2" => F::Unorm8x2,
        "unorm8x4" => F::Unorm8x4,
        "snorm8x2" => F::Snorm8x2,
        "snorm8x4" => F::Snorm8x4,
        "uint16x2" => F::Uint16x2,
        "uint16x4" => F::Uint16x4,
        "sint16x2" => F::Sint16x2,
        "sint16x4" => F::Sint16x4,
        "unorm16x2" => F::Unorm16x2,
        "unorm16x4" => F::Unorm16x4,
        "snorm16x2" => F::Snorm16x2,
        "snorm16x4" => F::Snorm16x4,
        "float16x2" => F::Float16x2,
        "float16x4" => F::Float16x4,
        "float32" => F::Float32,
        "float32x2" => F::Float32x2,
        "float32x3" => F::Float32x3,
        "float32x4" => F::Float32x4,
        "uint32" => F::Uint32,
        "uint32x2" => F::Uint32x2,
        "uint32x3" => F::Uint32x3,
        "uint32x4" => F::Uint32x4,
        "sint32" => F::Sint32,
        "sint32x2" => F::Sint32x2,
        "sint32x3" => F::Sint32x3,
        "sint32x4" => F::Sint32x4,
        "unorm10-10-10-2" | "unorm10_10_10_2" => F::Unorm10_10_10_2,
        _ => return None,
    })
}

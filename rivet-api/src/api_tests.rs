use crate::null::RivetApiDefNull;
use crate::*;

fn create_api() -> RivetApi {
    RivetApi::new(&RivetApiDef {
        validation_enabled: true,
    })
    .unwrap()
}

fn create_shader(device_context: &RivetDeviceContext) -> RivetShader {
    device_context
        .create_shader(vec![
            RivetShaderStageDef::new(RivetShaderStageFlags::VERTEX, "main", "vs"),
            RivetShaderStageDef::new(RivetShaderStageFlags::FRAGMENT, "main", "fs"),
        ])
        .unwrap()
}

#[test]
fn test_create_and_destroy_objects() {
    let mut api = create_api();
    let device_context = api.device_context();

    let buffer = device_context
        .create_buffer(&RivetBufferDef::for_vertex_buffer(1024))
        .unwrap();
    let texture = device_context
        .create_texture(&RivetTextureDef::for_2d(
            64,
            64,
            RivetFormat::R8G8B8A8_SRGB,
        ))
        .unwrap();
    let sampler = device_context
        .create_sampler(&RivetSamplerDef::default())
        .unwrap();
    let shader = create_shader(&device_context);

    assert_eq!(buffer.buffer_def().size, 1024);
    assert_eq!(texture.texture_def().extents.width, 64);
    assert_eq!(
        shader.stage_flags(),
        RivetShaderStageFlags::VERTEX | RivetShaderStageFlags::FRAGMENT
    );
    assert_eq!(device_context.live_object_count(), 4);

    device_context.destroy_buffer(buffer).unwrap();
    device_context.destroy_texture(texture).unwrap();
    device_context.destroy_sampler(sampler).unwrap();
    device_context.destroy_shader(shader).unwrap();

    let stats = device_context.stats();
    assert_eq!(stats.live_objects, 0);
    assert_eq!(stats.created_objects, 4);
    assert_eq!(stats.destroyed_objects, 4);

    api.destroy().unwrap();
}

#[test]
fn test_invalid_definitions_fail_creation() {
    let api = create_api();
    let device_context = api.device_context();

    assert!(device_context
        .create_buffer(&RivetBufferDef::for_vertex_buffer(0))
        .is_err());
    assert!(device_context
        .create_texture(&RivetTextureDef::for_2d(0, 0, RivetFormat::R8_UNORM))
        .is_err());
    assert!(device_context.create_shader(vec![]).is_err());

    let stats = device_context.stats();
    assert_eq!(stats.failed_creations, 3);
    assert_eq!(stats.created_objects, 0);
    assert_eq!(stats.live_objects, 0);
}

#[test]
fn test_double_destroy_is_rejected() {
    let api = create_api();
    let null_device_context = api.null_api().unwrap().device_context();

    let id = null_device_context
        .allocate_object(RivetObjectType::Buffer)
        .unwrap();
    assert!(null_device_context
        .free_object(id, RivetObjectType::Texture)
        .is_err());
    null_device_context
        .free_object(id, RivetObjectType::Buffer)
        .unwrap();
    assert!(null_device_context
        .free_object(id, RivetObjectType::Buffer)
        .is_err());
}

#[test]
fn test_destroy_reports_leaked_objects() {
    let mut api = create_api();
    let device_context = api.device_context();
    let buffer = device_context
        .create_buffer(&RivetBufferDef::for_uniform_buffer(256))
        .unwrap();

    assert!(api.destroy().is_err());

    // A second destroy is a no-op, the leak was already reported
    assert!(api.destroy().is_ok());
    drop(buffer);
}

#[test]
fn test_max_live_objects() {
    let api = RivetApi::new_null(
        &RivetApiDef::default(),
        &RivetApiDefNull {
            max_live_objects: Some(2),
        },
    )
    .unwrap();
    let device_context = api.device_context();

    let a = device_context
        .create_buffer(&RivetBufferDef::for_vertex_buffer(16))
        .unwrap();
    let b = device_context
        .create_buffer(&RivetBufferDef::for_vertex_buffer(16))
        .unwrap();
    let error = device_context
        .create_buffer(&RivetBufferDef::for_vertex_buffer(16))
        .unwrap_err();
    assert!(error.to_string().contains("out of device memory"));

    device_context.destroy_buffer(a).unwrap();
    let c = device_context
        .create_buffer(&RivetBufferDef::for_vertex_buffer(16))
        .unwrap();

    device_context.destroy_buffer(b).unwrap();
    device_context.destroy_buffer(c).unwrap();
}

#[test]
fn test_draw_requires_bindings() {
    let api = create_api();
    let device_context = api.device_context();
    let mut context = device_context
        .create_context(&RivetContextDef::default())
        .unwrap();

    // Recording outside of a frame fails
    assert!(context.draw(3, 0).is_err());

    let shader = create_shader(&device_context);
    let vertices = device_context
        .create_buffer(&RivetBufferDef::for_vertex_buffer(1024))
        .unwrap();
    let indices = device_context
        .create_buffer(&RivetBufferDef::for_index_buffer(12))
        .unwrap();

    context.begin_frame();
    assert!(context.draw(3, 0).is_err());
    context.bind_shader(&shader).unwrap();
    assert!(context.draw(3, 0).is_err());
    context.bind_vertex_buffers(&[&vertices]).unwrap();
    context.draw(3, 0).unwrap();

    // Index buffers are only usable if their resource type says so
    assert!(context
        .bind_index_buffer(&vertices, RivetIndexType::Uint16)
        .is_err());
    assert!(context.draw_indexed(6, 0).is_err());
    context
        .bind_index_buffer(&indices, RivetIndexType::Uint16)
        .unwrap();
    context.draw_indexed(6, 0).unwrap();

    // 12 bytes holds 6 u16 indices
    assert!(context.draw_indexed(6, 1).is_err());
    context.end_frame();

    // Bindings do not survive the frame
    context.begin_frame();
    assert!(context.draw(3, 0).is_err());
    context.end_frame();

    let stats = context.stats();
    assert_eq!(stats.frames, 2);
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.vertices_drawn, 9);

    drop(context);
    device_context.destroy_buffer(vertices).unwrap();
    device_context.destroy_buffer(indices).unwrap();
    device_context.destroy_shader(shader).unwrap();
    assert_eq!(device_context.live_object_count(), 0);
}

#[test]
fn test_update_buffer_bounds() {
    let api = create_api();
    let device_context = api.device_context();
    let mut context = device_context
        .create_context(&RivetContextDef::default())
        .unwrap();
    let buffer = device_context
        .create_buffer(&RivetBufferDef::for_uniform_buffer(8))
        .unwrap();

    context.begin_frame();
    context.update_buffer(&buffer, 0, &[0; 8]).unwrap();
    context.update_buffer(&buffer, 4, &[0; 4]).unwrap();
    assert!(context.update_buffer(&buffer, 4, &[0; 5]).is_err());
    context.end_frame();
    assert_eq!(context.stats().bytes_uploaded, 12);

    device_context.destroy_buffer(buffer).unwrap();
}

#[test]
fn test_vertex_arrays_are_cached_and_collected() {
    let api = create_api();
    let device_context = api.device_context();
    let mut context = device_context
        .create_context(&RivetContextDef {
            vertex_array_time_to_keep: 2,
        })
        .unwrap();

    let a = device_context
        .create_buffer(&RivetBufferDef::for_vertex_buffer(64))
        .unwrap();
    let b = device_context
        .create_buffer(&RivetBufferDef::for_vertex_buffer(64))
        .unwrap();
    assert_eq!(device_context.live_object_count(), 2);

    context.begin_frame();
    context.bind_vertex_buffers(&[&a, &b]).unwrap();
    context.bind_vertex_buffers(&[&a, &b]).unwrap();
    context.bind_vertex_buffers(&[&a]).unwrap();
    context.end_frame();

    // Two distinct combinations, two vertex arrays
    assert_eq!(context.stats().vertex_arrays_created, 2);
    assert_eq!(context.stats().cached_vertex_arrays, 2);
    assert_eq!(device_context.live_object_count(), 4);

    // Keep [a] alive, let [a, b] expire
    assert_eq!(context.gc(), 0);
    context.begin_frame();
    context.bind_vertex_buffers(&[&a]).unwrap();
    context.end_frame();
    assert_eq!(context.gc(), 1);
    assert_eq!(device_context.live_object_count(), 3);

    // Dropping the context destroys whatever is still cached
    drop(context);
    assert_eq!(device_context.live_object_count(), 2);

    device_context.destroy_buffer(a).unwrap();
    device_context.destroy_buffer(b).unwrap();
}

#[test]
fn test_bind_texture_slot_range() {
    let api = create_api();
    let device_context = api.device_context();
    let mut context = device_context
        .create_context(&RivetContextDef::default())
        .unwrap();
    let texture = device_context
        .create_texture(&RivetTextureDef::for_2d(4, 4, RivetFormat::R8_UNORM))
        .unwrap();

    let slot_count = device_context.device_info().max_texture_slots;
    context.begin_frame();
    context.bind_texture(0, &texture).unwrap();
    context.bind_texture(slot_count - 1, &texture).unwrap();
    assert!(context.bind_texture(slot_count, &texture).is_err());
    context.end_frame();

    device_context.destroy_texture(texture).unwrap();
}

#[test]
#[should_panic(expected = "begin_frame called twice")]
fn test_nested_begin_frame_panics() {
    let api = create_api();
    let mut context = api
        .device_context()
        .create_context(&RivetContextDef::default())
        .unwrap();
    context.begin_frame();
    context.begin_frame();
}

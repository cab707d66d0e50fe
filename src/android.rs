//! JNI calls into the hosting activity.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use jni::{
    objects::{JObject, JString, JValueGen},
    sys::{jint, JNIInvokeInterface_, _jobject},
    JavaVM,
};
use log::info;
use slint::android::AndroidApp;

pub const CAMERA_PERMISSION: &str = "android.permission.CAMERA";
const CAMERA_PERMISSION_REQUEST: i32 = 100;

fn java_vm(app: &AndroidApp) -> Result<JavaVM> {
    Ok(unsafe { JavaVM::from_raw(app.vm_as_ptr() as *mut *const JNIInvokeInterface_)? })
}

pub fn sdk_version(app: &AndroidApp) -> Result<i32> {
    let vm = java_vm(app)?;
    let mut env = vm.attach_current_thread()?;
    Ok(env
        .get_static_field("android/os/Build$VERSION", "SDK_INT", "I")?
        .i()?)
}

pub fn check_self_permission(app: &AndroidApp, permission: &str) -> Result<bool> {
    let vm = java_vm(app)?;
    let mut env = vm.attach_current_thread()?;
    let granted_int = env
        .get_static_field(
            "android/content/pm/PackageManager",
            "PERMISSION_GRANTED",
            "I",
        )?
        .i()?;
    let permission_str = env.new_string(permission)?;
    let activity = unsafe { JObject::from_raw(app.activity_as_ptr() as *mut _jobject) };
    let result = env
        .call_method(
            activity,
            "checkSelfPermission",
            "(Ljava/lang/String;)I",
            &[JValueGen::Object(&JObject::from(permission_str))],
        )?
        .i()?;
    Ok(result == granted_int)
}

/// The app's private files directory; settings and OCR models live here.
/// Unlike the cache directory, the OS never purges it.
pub fn files_dir(app: &AndroidApp) -> Result<PathBuf> {
    let vm = java_vm(app)?;
    let mut env = vm.attach_current_thread()?;
    let activity = unsafe { JObject::from_raw(app.activity_as_ptr() as *mut _jobject) };

    let file = env.call_method(activity, "getFilesDir", "()Ljava/io/File;", &[])?;
    let JValueGen::Object(file) = file else {
        return Err(anyhow!("object is not a file"));
    };
    let path = env.call_method(file, "getAbsolutePath", "()Ljava/lang/String;", &[])?;
    let JValueGen::Object(path) = path else {
        return Err(anyhow!("object is not a string"));
    };
    let path: JString = path.into();
    let path: String = env.get_string(&path)?.into();
    Ok(PathBuf::from(path))
}

pub fn request_permissions(app: &AndroidApp, permissions: &[&str], request_code: i32) -> Result<()> {
    let vm = java_vm(app)?;
    let mut env = vm.attach_current_thread()?;
    let activity = unsafe { JObject::from_raw(app.activity_as_ptr() as *mut _jobject) };

    let java_permission_array =
        env.new_object_array(permissions.len() as jint, "java/lang/String", JObject::null())?;
    for (index, permission) in permissions.iter().enumerate() {
        let permission_str = env.new_string(*permission)?;
        env.set_object_array_element(&java_permission_array, index as jint, permission_str)?;
    }

    env.call_method(
        activity,
        "requestPermissions",
        "([Ljava/lang/String;I)V",
        &[
            JValueGen::Object(&JObject::from(java_permission_array)),
            request_code.into(),
        ],
    )?;
    Ok(())
}

/// Runtime permissions exist from API 23 on.
pub fn request_camera_permission(app: &AndroidApp) -> Result<()> {
    let sdk_version = sdk_version(app)?;
    info!("sdk version:{sdk_version}");
    if sdk_version >= 23 && !check_self_permission(app, CAMERA_PERMISSION)? {
        request_permissions(app, &[CAMERA_PERMISSION], CAMERA_PERMISSION_REQUEST)?;
    }
    Ok(())
}

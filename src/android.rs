use std::time::Duration;

use anyhow::{anyhow, Result};
use jni::{
    objects::{JObject, JValueGen},
    sys::{JNIInvokeInterface_, _jobject, jint},
    JavaVM,
};
use log::info;
use slint::android::AndroidApp;

pub const CAMERA_PERMISSION: &str = "android.permission.CAMERA";

pub fn sdk_version(app: &AndroidApp) -> Result<i32> {
    unsafe {
        let vm = JavaVM::from_raw(app.vm_as_ptr() as *mut *const JNIInvokeInterface_)?;
        let mut env = vm.attach_current_thread()?;
        Ok(env
            .get_static_field("android/os/Build$VERSION", "SDK_INT", "I")?
            .i()?)
    }
}

pub fn check_self_permission(app: &AndroidApp, permission: &str) -> Result<bool> {
    unsafe {
        let vm = JavaVM::from_raw(app.vm_as_ptr() as *mut *const JNIInvokeInterface_)?;
        let mut env = vm.attach_current_thread()?;
        let granted_int = env
            .get_static_field(
                "android/content/pm/PackageManager",
                "PERMISSION_GRANTED",
                "I",
            )?
            .i()?;
        let permission_str = env.new_string(permission)?;
        let activity: JObject<'_> = JObject::from_raw(app.activity_as_ptr() as *mut _jobject);
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
}

pub fn request_permissions(app: &AndroidApp, permissions: &[&str], request_code: i32) -> Result<()> {
    unsafe {
        let vm = JavaVM::from_raw(app.vm_as_ptr() as *mut *const JNIInvokeInterface_)?;
        let mut env = vm.attach_current_thread()?;
        let activity: JObject<'_> = JObject::from_raw(app.activity_as_ptr() as *mut _jobject);

        let permission_count = permissions.len() as jint;
        let java_permission_array =
            env.new_object_array(permission_count, "java/lang/String", JObject::null())?;
        for (index, permission) in permissions.iter().enumerate() {
            let permission_str = env.new_string(*permission)?;
            env.set_object_array_element(&java_permission_array, index as jint, permission_str)?;
        }

        let _ = env.call_method(
            activity,
            "requestPermissions",
            "([Ljava/lang/String;I)V",
            &[
                JValueGen::Object(&JObject::from(java_permission_array)),
                request_code.into(),
            ],
        )?;
    }
    Ok(())
}

pub fn request_camera_permission(app: &AndroidApp) -> Result<()> {
    let sdk_version = sdk_version(app)?;
    info!("sdk version:{sdk_version}");
    if sdk_version > 23 && !check_self_permission(app, CAMERA_PERMISSION)? {
        request_permissions(app, &[CAMERA_PERMISSION], 100)?;
    }
    Ok(())
}

/// One-shot vibration through the system `Vibrator` service.
pub fn vibrate(app: &AndroidApp, duration: Duration) -> Result<()> {
    unsafe {
        let vm = JavaVM::from_raw(app.vm_as_ptr() as *mut *const JNIInvokeInterface_)?;
        let mut env = vm.attach_current_thread()?;
        let activity: JObject<'_> = JObject::from_raw(app.activity_as_ptr() as *mut _jobject);
        let service_name = env.new_string("vibrator")?;
        let vibrator = env
            .call_method(
                activity,
                "getSystemService",
                "(Ljava/lang/String;)Ljava/lang/Object;",
                &[JValueGen::Object(&JObject::from(service_name))],
            )?
            .l()?;
        if vibrator.is_null() {
            return Err(anyhow!("vibrator service not available"));
        }
        env.call_method(
            vibrator,
            "vibrate",
            "(J)V",
            &[JValueGen::Long(duration.as_millis() as i64)],
        )?;
    }
    Ok(())
}
